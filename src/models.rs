//! Data models for the Anti-Captcha task API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CaptchaError, Result};

/// Status reported while a task is still being solved.
pub const STATUS_PROCESSING: &str = "processing";

/// Remote endpoints used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    CreateTask,
    GetTaskResult,
}

impl Endpoint {
    /// Path under the service root.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::CreateTask => "/createTask",
            Endpoint::GetTaskResult => "/getTaskResult",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Numeric handle assigned by the service to a published task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Zero is never a published task.
    pub fn is_unset(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Captcha-specific task parameters sent under `task`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskBody(Map<String, Value>);

impl TaskBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a caller-built mapping as-is.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for TaskBody {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Solution payload returned once a task is solved. Shape depends on the task type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Solution(Map<String, Value>);

impl Solution {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Pull a string field out of the solution.
    pub fn string_field(&self, field: &'static str) -> Result<String> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(CaptchaError::Extraction { field })
    }
}

/// Body of `/createTask`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest<'a> {
    pub client_key: &'a str,
    pub task: &'a TaskBody,
}

/// Body of `/getTaskResult`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTaskResultRequest<'a> {
    pub client_key: &'a str,
    pub task_id: TaskId,
}

/// Decoded JSON object returned by either endpoint.
///
/// The same shape serves both calls, so fields are read contextually.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ServiceResponse(Map<String, Value>);

impl ServiceResponse {
    /// `taskId` when it is a non-negative integral number.
    ///
    /// Fractional or negative numbers are not valid task handles and are
    /// treated as absent, so the caller reports the response's error code.
    pub fn task_id(&self) -> Option<TaskId> {
        let value = self.0.get("taskId")?;
        value
            .as_u64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            })
            .map(TaskId)
    }

    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(Value::as_str)
    }

    pub fn solution(&self) -> Option<&Map<String, Value>> {
        self.0.get("solution").and_then(Value::as_object)
    }

    pub fn error_code(&self) -> Option<&str> {
        self.0.get("errorCode").and_then(Value::as_str)
    }

    pub fn error_description(&self) -> Option<&str> {
        self.0.get("errorDescription").and_then(Value::as_str)
    }

    /// Service error built from whatever `errorCode` the response carries.
    pub fn to_error(&self) -> CaptchaError {
        CaptchaError::service(self.error_code(), self.error_description())
    }
}
