//! Thread-blocking wrapper around [`crate::AntiCaptcha`].
//!
//! Each call runs the async pipeline to completion on a private
//! current-thread runtime, so the calling thread is blocked for the whole
//! polling duration. Must not be used from inside an async runtime.

use tokio::runtime::{Builder, Runtime};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::models::TaskBody;
use crate::tasks::CaptchaTask;

/// Blocking AntiCaptcha client.
pub struct AntiCaptcha {
    inner: crate::AntiCaptcha,
    runtime: Runtime,
}

impl AntiCaptcha {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            inner: crate::AntiCaptcha::new(config),
            runtime,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.inner.config()
    }

    pub fn solve<C: CaptchaTask>(&self, task: C) -> Result<String> {
        self.runtime.block_on(self.inner.solve(task))
    }

    pub fn solve_image(&self, base64_image: &str, extra: TaskBody) -> Result<String> {
        self.runtime.block_on(self.inner.solve_image(base64_image, extra))
    }

    pub fn solve_recaptcha(
        &self,
        website_url: &str,
        website_key: &str,
        extra: TaskBody,
    ) -> Result<String> {
        self.runtime
            .block_on(self.inner.solve_recaptcha(website_url, website_key, extra))
    }

    pub fn solve_funcaptcha(
        &self,
        website_url: &str,
        website_key: &str,
        extra: TaskBody,
    ) -> Result<String> {
        self.runtime
            .block_on(self.inner.solve_funcaptcha(website_url, website_key, extra))
    }
}
