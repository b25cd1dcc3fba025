//! Main AntiCaptcha client: publish a task, poll for its result, extract the answer.

use std::fmt;

use crate::config::ClientConfig;
use crate::error::{CaptchaError, Result};
use crate::models::{
    CreateTaskRequest, Endpoint, GetTaskResultRequest, Solution, TaskBody, TaskId,
    STATUS_PROCESSING,
};
use crate::tasks::{CaptchaTask, FunCaptchaTask, ImageToTextTask, RecaptchaTask};
use crate::transport::{HttpTransport, Transport};

/// AntiCaptcha solver client.
///
/// Every `solve_*` call drives one task end to end in its own [`TaskSession`].
///
/// # Example
/// ```ignore
/// use anticap::{AntiCaptcha, ClientConfig, TaskBody};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = AntiCaptcha::new(ClientConfig::new("your_client_key"));
///
///     let token = client
///         .solve_recaptcha("https://example.com/login", "6Le-site-key", TaskBody::new())
///         .await?;
///     println!("Solved: {}", token);
///     Ok(())
/// }
/// ```
pub struct AntiCaptcha<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
}

impl AntiCaptcha<HttpTransport> {
    /// Create a client talking HTTP to the configured service.
    pub fn new(config: ClientConfig) -> Self {
        let transport = HttpTransport::new(&config);
        Self { config, transport }
    }
}

impl<T: Transport> AntiCaptcha<T> {
    /// Create a client over a custom transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a fresh session for a single task.
    pub fn session(&self) -> TaskSession<'_, T> {
        TaskSession::new(&self.config, &self.transport)
    }

    /// Publish any task, wait for it, and return its answer field.
    pub async fn solve<C: CaptchaTask>(&self, task: C) -> Result<String> {
        self.session().solve(task).await
    }

    /// Solve an image captcha given as base64. Returns the recognized text.
    pub async fn solve_image(&self, base64_image: &str, extra: TaskBody) -> Result<String> {
        self.solve(ImageToTextTask::new(base64_image).extra(extra)).await
    }

    /// Solve a reCAPTCHA. Returns `gRecaptchaResponse`.
    pub async fn solve_recaptcha(
        &self,
        website_url: &str,
        website_key: &str,
        extra: TaskBody,
    ) -> Result<String> {
        self.solve(RecaptchaTask::new(website_url, website_key).extra(extra)).await
    }

    /// Solve a FunCaptcha. Returns the `token`.
    pub async fn solve_funcaptcha(
        &self,
        website_url: &str,
        website_key: &str,
        extra: TaskBody,
    ) -> Result<String> {
        self.solve(FunCaptchaTask::new(website_url, website_key).extra(extra)).await
    }
}

/// State of one in-flight task.
///
/// A session publishes at most one task. After a failure it keeps whatever
/// it reached (task id, solution) for inspection; it is not resumed
/// automatically.
pub struct TaskSession<'a, T> {
    config: &'a ClientConfig,
    transport: &'a T,
    task_id: Option<TaskId>,
    solution: Option<Solution>,
}

impl<'a, T: Transport> TaskSession<'a, T> {
    pub fn new(config: &'a ClientConfig, transport: &'a T) -> Self {
        Self {
            config,
            transport,
            task_id: None,
            solution: None,
        }
    }

    /// Id assigned by the service, once published.
    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    /// Solution, once the service reported one.
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    /// Build, publish and wait for `task`, then extract its answer field.
    pub async fn solve<C: CaptchaTask>(&mut self, task: C) -> Result<String> {
        let kind = task.kind();
        self.progress(format_args!("solving {} task", kind));
        let body = task.into_body().map_err(|e| self.fail(e))?;

        self.publish(&body).await?;
        let extracted = self
            .get_solution()
            .await?
            .string_field(kind.solution_field());
        let word = extracted.map_err(|e| self.fail(e))?;

        self.progress(format_args!("solution got: {}", word));
        Ok(word)
    }

    /// Submit `task` to `/createTask` and remember the returned id.
    pub async fn publish(&mut self, task: &TaskBody) -> Result<TaskId> {
        self.progress(format_args!("publishing a task..."));

        if self.task_id.is_some() {
            return Err(self.fail(CaptchaError::Config(
                "session already published a task, start a new session".into(),
            )));
        }

        if self.config.client_key().is_empty() {
            return Err(self.fail(CaptchaError::Config("empty client key".into())));
        }

        if task.is_empty() {
            return Err(self.fail(CaptchaError::Config("empty task".into())));
        }

        let request = CreateTaskRequest {
            client_key: self.config.client_key(),
            task,
        };
        let body = serde_json::to_vec(&request).map_err(|e| self.fail(e.into()))?;

        let content = self
            .transport
            .post(Endpoint::CreateTask, body)
            .await
            .map_err(|e| self.fail(e))?;

        let task_id = content.task_id().ok_or_else(|| self.fail(content.to_error()))?;

        self.task_id = Some(task_id);
        self.progress(format_args!("task published: {}", task_id));
        Ok(task_id)
    }

    /// Poll `/getTaskResult` until the task leaves `processing`.
    ///
    /// Sleeps the configured interval between attempts, with no attempt limit.
    pub async fn get_solution(&mut self) -> Result<&Solution> {
        self.progress(format_args!("trying to get a solution..."));

        if self.config.client_key().is_empty() {
            return Err(self.fail(CaptchaError::Config("empty client key".into())));
        }

        let task_id = match self.task_id {
            Some(id) if !id.is_unset() => id,
            _ => return Err(self.fail(CaptchaError::Config("empty task id".into()))),
        };

        let request = GetTaskResultRequest {
            client_key: self.config.client_key(),
            task_id,
        };
        let body = serde_json::to_vec(&request).map_err(|e| self.fail(e.into()))?;
        let interval = self.config.poll_interval();

        loop {
            self.progress(format_args!("waiting for a solution..."));

            let content = self
                .transport
                .post(Endpoint::GetTaskResult, body.clone())
                .await
                .map_err(|e| self.fail(e))?;

            let status = content.status().ok_or_else(|| self.fail(content.to_error()))?;

            if status != STATUS_PROCESSING {
                let solution = content
                    .solution()
                    .cloned()
                    .ok_or_else(|| self.fail(content.to_error()))?;

                tracing::debug!("Task {} finished with status '{}'", task_id, status);
                return Ok(self.solution.insert(Solution::from_map(solution)));
            }

            tokio::time::sleep(interval).await;
        }
    }

    fn progress(&self, message: fmt::Arguments<'_>) {
        if self.config.verbose() {
            tracing::info!("{}", message);
        } else {
            tracing::debug!("{}", message);
        }
    }

    fn fail(&self, err: CaptchaError) -> CaptchaError {
        if self.config.verbose() {
            tracing::error!("{}", err);
        } else {
            tracing::debug!("{}", err);
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceResponse;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Replays canned responses and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<ServiceResponse>>>,
        requests: Mutex<Vec<(Endpoint, Value)>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Value>) -> Self {
            let responses = responses
                .into_iter()
                .map(|v| Ok(serde_json::from_value(v).unwrap()))
                .collect();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::default(),
            }
        }

        fn push_error(&self, err: CaptchaError) {
            self.responses.lock().unwrap().push_back(Err(err));
        }

        fn requests(&self) -> Vec<(Endpoint, Value)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post(&self, endpoint: Endpoint, body: Vec<u8>) -> Result<ServiceResponse> {
            let body: Value = serde_json::from_slice(&body).unwrap();
            self.requests.lock().unwrap().push((endpoint, body));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }
    }

    fn client(key: &str, responses: Vec<Value>) -> AntiCaptcha<ScriptedTransport> {
        let config = ClientConfig::builder(key)
            .poll_interval(Duration::from_secs(2))
            .build();
        AntiCaptcha::with_transport(config, ScriptedTransport::new(responses))
    }

    fn some_task() -> TaskBody {
        let mut task = TaskBody::new();
        task.insert("type", "ImageToTextTask");
        task
    }

    /// Formatted log output kept in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `solve_image` under an INFO-level subscriber and return what it logged.
    fn solve_image_logged(verbose: bool, responses: Vec<Value>) -> (Result<String>, Vec<String>) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();

        let config = ClientConfig::builder("key").verbose(verbose).build();
        let client = AntiCaptcha::with_transport(config, ScriptedTransport::new(responses));

        let result = tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(client.solve_image("aGVsbG8=", TaskBody::new()))
        });
        (result, logs.lines())
    }

    fn solved_image_responses() -> Vec<Value> {
        vec![
            json!({"taskId": 12345}),
            json!({"status": "ready", "solution": {"text": "ABCD"}}),
        ]
    }

    #[test]
    fn test_verbose_logs_progress_without_changing_result() {
        let (quiet, quiet_logs) = solve_image_logged(false, solved_image_responses());
        let (verbose, verbose_logs) = solve_image_logged(true, solved_image_responses());

        assert_eq!(quiet.unwrap(), "ABCD");
        assert_eq!(verbose.unwrap(), "ABCD");
        assert!(quiet_logs.is_empty(), "quiet run logged: {quiet_logs:?}");
        assert!(verbose_logs
            .iter()
            .any(|l| l.contains("INFO") && l.contains("task published: 12345")));
        assert!(verbose_logs
            .iter()
            .any(|l| l.contains("INFO") && l.contains("solving image task")));
    }

    #[test]
    fn test_verbose_logs_failures_as_errors() {
        let responses = vec![
            json!({"taskId": 12345}),
            json!({"status": "ready", "solution": {"token": "T"}}),
        ];
        let (result, logs) = solve_image_logged(true, responses);

        tokio_test::assert_err!(&result);
        assert!(matches!(result, Err(CaptchaError::Extraction { field: "text" })));
        assert!(logs
            .iter()
            .any(|l| l.contains("ERROR") && l.contains("Unable to find field 'text'")));
    }

    #[tokio::test]
    async fn test_publish_empty_key() {
        let client = client("", vec![]);
        let mut session = client.session();
        let result = session.publish(&some_task()).await;
        assert!(matches!(result, Err(CaptchaError::Config(_))));
        assert!(client.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_publish_empty_task() {
        let client = client("key", vec![]);
        let result = client.session().publish(&TaskBody::new()).await;
        assert!(matches!(result, Err(CaptchaError::Config(_))));
        assert!(client.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_solution_empty_key() {
        let client = client("", vec![]);
        let mut session = client.session();
        session.task_id = Some(TaskId(5));
        assert!(matches!(
            session.get_solution().await,
            Err(CaptchaError::Config(_))
        ));
        assert!(client.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_solution_without_task_id() {
        let client = client("key", vec![]);
        let mut session = client.session();
        assert!(matches!(
            session.get_solution().await,
            Err(CaptchaError::Config(_))
        ));

        session.task_id = Some(TaskId(0));
        assert!(matches!(
            session.get_solution().await,
            Err(CaptchaError::Config(_))
        ));
        assert!(client.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_publish_sends_key_and_task() {
        let client = client("secret", vec![json!({"errorId": 0, "taskId": 12345})]);
        let mut session = client.session();

        let id = session.publish(&some_task()).await.unwrap();
        assert_eq!(id, TaskId(12345));
        assert_eq!(session.task_id(), Some(TaskId(12345)));

        let requests = client.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, Endpoint::CreateTask);
        assert_eq!(
            requests[0].1,
            json!({"clientKey": "secret", "task": {"type": "ImageToTextTask"}})
        );
    }

    #[tokio::test]
    async fn test_publish_service_error() {
        let client = client(
            "bad",
            vec![json!({"errorId": 1, "errorCode": "ERROR_KEY_DOES_NOT_EXIST"})],
        );
        let mut session = client.session();
        let err = session.publish(&some_task()).await.unwrap_err();
        assert_eq!(err.service_code(), Some("ERROR_KEY_DOES_NOT_EXIST"));
        assert!(session.task_id().is_none());
    }

    #[tokio::test]
    async fn test_publish_unknown_error() {
        let client = client("key", vec![json!({"taskId": "abc"})]);
        let err = client.session().publish(&some_task()).await.unwrap_err();
        assert_eq!(err.service_code(), Some("unknown"));
    }

    #[tokio::test]
    async fn test_publish_transport_error() {
        let client = client("key", vec![]);
        client
            .transport
            .push_error(CaptchaError::transport(std::io::Error::other("connection refused")));
        let result = client.session().publish(&some_task()).await;
        assert!(matches!(result, Err(CaptchaError::Transport(_))));
    }

    #[tokio::test]
    async fn test_session_publishes_once() {
        let client = client("key", vec![json!({"taskId": 1})]);
        let mut session = client.session();
        session.publish(&some_task()).await.unwrap();
        let second = session.publish(&some_task()).await;
        assert!(matches!(second, Err(CaptchaError::Config(_))));
        assert_eq!(client.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_solve_image() {
        let client = client(
            "key",
            vec![
                json!({"taskId": 12345}),
                json!({"status": "ready", "solution": {"text": "ABCD"}}),
            ],
        );
        let word = client.solve_image("aGVsbG8=", TaskBody::new()).await.unwrap();
        assert_eq!(word, "ABCD");

        let requests = client.transport.requests();
        assert_eq!(requests[0].1["task"]["type"], "ImageToTextTask");
        assert_eq!(requests[0].1["task"]["body"], "aGVsbG8=");
        assert_eq!(requests[1].0, Endpoint::GetTaskResult);
        assert_eq!(requests[1].1, json!({"clientKey": "key", "taskId": 12345}));
    }

    #[tokio::test]
    async fn test_solve_image_invalid_base64() {
        let client = client("key", vec![]);
        let result = client.solve_image("not base64 at all!", TaskBody::new()).await;
        assert!(matches!(result, Err(CaptchaError::Validation(_))));
        assert!(client.transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_solve_recaptcha_polls_at_interval() {
        const PROCESSING_ROUNDS: u32 = 3;

        let mut responses = vec![json!({"taskId": 77})];
        responses.extend((0..PROCESSING_ROUNDS).map(|_| json!({"status": "processing"})));
        responses.push(json!({"status": "ready", "solution": {"gRecaptchaResponse": "R"}}));
        let client = client("key", responses);

        let started = tokio::time::Instant::now();
        let token = client
            .solve_recaptcha("https://example.com", "site-key", TaskBody::new())
            .await
            .unwrap();

        assert_eq!(token, "R");
        assert_eq!(started.elapsed(), Duration::from_secs(2) * PROCESSING_ROUNDS);
        assert_eq!(
            client.transport.requests().len(),
            1 + PROCESSING_ROUNDS as usize + 1
        );
    }

    #[tokio::test]
    async fn test_solve_recaptcha_keeps_type() {
        let client = client(
            "key",
            vec![
                json!({"taskId": 1}),
                json!({"status": "ready", "solution": {"gRecaptchaResponse": "R"}}),
            ],
        );
        let mut extra = TaskBody::new();
        extra.insert("type", "NoCaptchaTask");
        client
            .solve_recaptcha("https://example.com", "site-key", extra)
            .await
            .unwrap();
        assert_eq!(client.transport.requests()[0].1["task"]["type"], "NoCaptchaTask");
    }

    #[tokio::test]
    async fn test_solve_funcaptcha_overwrites_type() {
        let client = client(
            "key",
            vec![
                json!({"taskId": 1}),
                json!({"status": "ready", "solution": {"token": "T"}}),
            ],
        );
        let mut extra = TaskBody::new();
        extra.insert("type", "NoCaptchaTask");
        let token = client
            .solve_funcaptcha("https://example.com", "public-key", extra)
            .await
            .unwrap();
        assert_eq!(token, "T");
        assert_eq!(client.transport.requests()[0].1["task"]["type"], "FunCaptchaTask");
    }

    #[tokio::test]
    async fn test_ready_without_solution() {
        let client = client("key", vec![json!({"taskId": 9}), json!({"status": "ready"})]);
        let mut session = client.session();
        let err = session.solve(ImageToTextTask::new("aGVsbG8=")).await.unwrap_err();
        assert_eq!(err.service_code(), Some("unknown"));
        assert_eq!(session.task_id(), Some(TaskId(9)));
        assert!(session.solution().is_none());
    }

    #[tokio::test]
    async fn test_missing_status_reports_error_code() {
        let client = client(
            "key",
            vec![
                json!({"taskId": 9}),
                json!({"errorId": 16, "errorCode": "ERROR_NO_SUCH_CAPCHA_ID"}),
            ],
        );
        let err = client
            .solve_image("aGVsbG8=", TaskBody::new())
            .await
            .unwrap_err();
        assert_eq!(err.service_code(), Some("ERROR_NO_SUCH_CAPCHA_ID"));
    }

    #[tokio::test]
    async fn test_wrong_solution_field() {
        let client = client(
            "key",
            vec![
                json!({"taskId": 9}),
                json!({"status": "ready", "solution": {"gRecaptchaResponse": "R"}}),
            ],
        );
        let mut session = client.session();
        let err = session.solve(ImageToTextTask::new("aGVsbG8=")).await.unwrap_err();
        assert!(matches!(err, CaptchaError::Extraction { field: "text" }));
        assert_eq!(
            session.solution().and_then(|s| s.get("gRecaptchaResponse")),
            Some(&json!("R"))
        );
    }
}
