//! Base64 helpers for image tasks.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{CaptchaError, Result};

/// Read a local file and return its standard base64 encoding.
pub fn local_file_to_base64(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    tracing::debug!("Encoded {} bytes from {:?}", bytes.len(), path);
    Ok(STANDARD.encode(bytes))
}

/// Check that `input` is legal standard base64.
pub fn validate_base64(input: &str) -> Result<()> {
    STANDARD.decode(input).map(|_| ()).map_err(|e| {
        CaptchaError::Validation(format!("unable to validate given base64 image: {}", e))
    })
}
