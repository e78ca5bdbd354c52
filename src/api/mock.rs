use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::AnalysisApi;
use crate::error::ApiError;
use crate::task::{AnalysisRequest, PlotResource, Task, TaskOutputs, TaskStatus};

/// One recorded call against a [`ScriptedApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Submit,
    Status(String),
    Outputs(String),
    Stdout(String),
    Plot(String),
    Samples {
        task_id: String,
        value_id: String,
        count: usize,
    },
}

/// A scripted service for tests. Each endpoint replays its queued responses
/// in order and fails once its queue runs dry.
#[derive(Default)]
pub struct ScriptedApi {
    submits: Mutex<VecDeque<Result<Task, ApiError>>>,
    statuses: Mutex<VecDeque<Result<TaskStatus, ApiError>>>,
    outputs: Mutex<VecDeque<Result<TaskOutputs, ApiError>>>,
    stdouts: Mutex<VecDeque<Result<String, ApiError>>>,
    plots: Mutex<VecDeque<Result<PlotResource, ApiError>>>,
    samples: Mutex<VecDeque<Result<Vec<f64>, ApiError>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit(mut self, response: Result<Task, ApiError>) -> Self {
        self.submits.get_mut().push_back(response);
        self
    }

    pub fn on_status(mut self, response: Result<TaskStatus, ApiError>) -> Self {
        self.statuses.get_mut().push_back(response);
        self
    }

    /// Queue the same status `times` times.
    pub fn on_status_repeated(self, status: TaskStatus, times: usize) -> Self {
        (0..times).fold(self, |api, _| api.on_status(Ok(status.clone())))
    }

    pub fn on_outputs(mut self, response: Result<TaskOutputs, ApiError>) -> Self {
        self.outputs.get_mut().push_back(response);
        self
    }

    pub fn on_stdout(mut self, response: Result<String, ApiError>) -> Self {
        self.stdouts.get_mut().push_back(response);
        self
    }

    pub fn on_plot(mut self, response: Result<PlotResource, ApiError>) -> Self {
        self.plots.get_mut().push_back(response);
        self
    }

    pub fn on_samples(mut self, response: Result<Vec<f64>, ApiError>) -> Self {
        self.samples.get_mut().push_back(response);
        self
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }
}

async fn next<T>(
    queue: &Mutex<VecDeque<Result<T, ApiError>>>,
    endpoint: &str,
) -> Result<T, ApiError> {
    queue.lock().await.pop_front().unwrap_or_else(|| {
        Err(ApiError::Decode(format!(
            "ScriptedApi: no more {endpoint} responses"
        )))
    })
}

#[async_trait]
impl AnalysisApi for ScriptedApi {
    async fn submit_task(&self, _request: &AnalysisRequest) -> Result<Task, ApiError> {
        self.record(Call::Submit).await;
        next(&self.submits, "submit").await
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ApiError> {
        self.record(Call::Status(task_id.to_string())).await;
        next(&self.statuses, "status").await
    }

    async fn task_outputs(&self, task_id: &str) -> Result<TaskOutputs, ApiError> {
        self.record(Call::Outputs(task_id.to_string())).await;
        next(&self.outputs, "outputs").await
    }

    async fn fetch_stdout(&self, url: &str) -> Result<String, ApiError> {
        self.record(Call::Stdout(url.to_string())).await;
        next(&self.stdouts, "stdout").await
    }

    async fn request_plot(&self, ux_string: &str) -> Result<PlotResource, ApiError> {
        self.record(Call::Plot(ux_string.to_string())).await;
        next(&self.plots, "plot").await
    }

    async fn value_samples(
        &self,
        task_id: &str,
        value_id: &str,
        count: usize,
    ) -> Result<Vec<f64>, ApiError> {
        self.record(Call::Samples {
            task_id: task_id.to_string(),
            value_id: value_id.to_string(),
            count,
        })
        .await;
        next(&self.samples, "samples").await
    }
}
