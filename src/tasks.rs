//! Typed task builders for each supported captcha variant.
//!
//! Every builder carries an `extra` mapping for service fields that are not
//! modelled here (e.g. `websiteSToken`, `proxyType`, `numeric`). Builders
//! turn into the untyped [`TaskBody`] sent to the service.

use std::path::Path;

use serde_json::Value;

use crate::encoding::{local_file_to_base64, validate_base64};
use crate::error::Result;
use crate::models::TaskBody;

/// Supported captcha variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Image-to-text captcha
    ImageToText,
    /// Google reCAPTCHA
    Recaptcha,
    /// Arkose Labs FunCaptcha
    FunCaptcha,
}

impl TaskKind {
    /// Returns the short name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ImageToText => "image",
            TaskKind::Recaptcha => "recaptcha",
            TaskKind::FunCaptcha => "funcaptcha",
        }
    }

    /// Solution field holding the answer for this variant.
    pub fn solution_field(&self) -> &'static str {
        match self {
            TaskKind::ImageToText => "text",
            TaskKind::Recaptcha => "gRecaptchaResponse",
            TaskKind::FunCaptcha => "token",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A variant-specific task that can be published.
pub trait CaptchaTask {
    /// Variant, which decides the extracted solution field.
    fn kind(&self) -> TaskKind;

    /// Validate and assemble the wire task mapping.
    fn into_body(self) -> Result<TaskBody>;
}

/// `ImageToTextTask`: recognize text on an image.
#[derive(Debug, Clone)]
pub struct ImageToTextTask {
    body: String,
    extra: TaskBody,
}

impl ImageToTextTask {
    /// Create from an already base64-encoded image.
    pub fn new(base64_image: impl Into<String>) -> Self {
        Self {
            body: base64_image.into(),
            extra: TaskBody::new(),
        }
    }

    /// Read and encode a local image file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(local_file_to_base64(path)?))
    }

    /// Add an extra task field, e.g. `("numeric", 1)`.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Start from a caller-built mapping.
    pub fn extra(mut self, extra: TaskBody) -> Self {
        self.extra = extra;
        self
    }
}

impl CaptchaTask for ImageToTextTask {
    fn kind(&self) -> TaskKind {
        TaskKind::ImageToText
    }

    fn into_body(self) -> Result<TaskBody> {
        validate_base64(&self.body)?;

        let mut task = self.extra;
        task.insert("type", "ImageToTextTask");
        task.insert("body", self.body);
        Ok(task)
    }
}

/// reCAPTCHA task. Defaults to `NoCaptchaTaskProxyless` unless the caller
/// supplies a `type` (e.g. `RecaptchaV3TaskProxyless`, `NoCaptchaTask`).
#[derive(Debug, Clone)]
pub struct RecaptchaTask {
    website_url: String,
    website_key: String,
    extra: TaskBody,
}

impl RecaptchaTask {
    pub fn new(website_url: impl Into<String>, website_key: impl Into<String>) -> Self {
        Self {
            website_url: website_url.into(),
            website_key: website_key.into(),
            extra: TaskBody::new(),
        }
    }

    /// Set the task `type`, kept as given.
    pub fn task_type(self, task_type: impl Into<String>) -> Self {
        let task_type: String = task_type.into();
        self.field("type", task_type)
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key, value);
        self
    }

    pub fn extra(mut self, extra: TaskBody) -> Self {
        self.extra = extra;
        self
    }
}

impl CaptchaTask for RecaptchaTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Recaptcha
    }

    fn into_body(self) -> Result<TaskBody> {
        let mut task = self.extra;
        task.insert("websiteURL", self.website_url);
        task.insert("websiteKey", self.website_key);

        if !task.contains_key("type") {
            task.insert("type", "NoCaptchaTaskProxyless");
        }

        Ok(task)
    }
}

/// `FunCaptchaTask`. The `type` is always forced to `FunCaptchaTask`.
#[derive(Debug, Clone)]
pub struct FunCaptchaTask {
    website_url: String,
    website_key: String,
    extra: TaskBody,
}

impl FunCaptchaTask {
    pub fn new(website_url: impl Into<String>, website_public_key: impl Into<String>) -> Self {
        Self {
            website_url: website_url.into(),
            website_key: website_public_key.into(),
            extra: TaskBody::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key, value);
        self
    }

    pub fn extra(mut self, extra: TaskBody) -> Self {
        self.extra = extra;
        self
    }
}

impl CaptchaTask for FunCaptchaTask {
    fn kind(&self) -> TaskKind {
        TaskKind::FunCaptcha
    }

    fn into_body(self) -> Result<TaskBody> {
        let mut task = self.extra;
        task.insert("type", "FunCaptchaTask");
        task.insert("websiteURL", self.website_url);
        task.insert("websiteKey", self.website_key);
        Ok(task)
    }
}
