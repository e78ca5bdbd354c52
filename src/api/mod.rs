pub mod http;
pub mod mock;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::task::{AnalysisRequest, PlotResource, Task, TaskOutputs, TaskStatus};

/// The remote analysis service, one method per endpoint.
///
/// The orchestrator only talks to this trait, so the real HTTP client and
/// scripted test doubles are interchangeable.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// `POST /tasks`. Accepted only with HTTP 202.
    async fn submit_task(&self, request: &AnalysisRequest) -> Result<Task, ApiError>;

    /// `GET /tasks/{id}`.
    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ApiError>;

    /// `GET /tasks/{id}/outputs?sanitized=false`.
    async fn task_outputs(&self, task_id: &str) -> Result<TaskOutputs, ApiError>;

    /// Download the raw text behind a pre-signed stdout URL.
    async fn fetch_stdout(&self, url: &str) -> Result<String, ApiError>;

    /// `POST /plot`. Accepted only with HTTP 201.
    async fn request_plot(&self, ux_string: &str) -> Result<PlotResource, ApiError>;

    /// `GET /tasks/{id}/values/{value_id}/samples?count=N`.
    async fn value_samples(
        &self,
        task_id: &str,
        value_id: &str,
        count: usize,
    ) -> Result<Vec<f64>, ApiError>;
}
