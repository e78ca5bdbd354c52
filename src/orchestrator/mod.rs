mod poll;

use std::sync::Arc;

use tracing::info;

use crate::api::AnalysisApi;
use crate::config::PollPolicy;
use crate::error::AnalysisError;
use crate::events::{Event, EventBus};
use crate::extract;
use crate::task::{AnalysisRequest, PlotResource, Task, TaskStatus, ValueSamples};

/// What to do with a finished task's output. Always chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Plot the last Ux value printed.
    Plot,
    /// Draw `count` samples of the last `<ValueID>` printed.
    Samples { count: usize },
}

/// Result of a run, matching the [`Strategy`] that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Plot(PlotResource),
    Samples(ValueSamples),
}

/// Drives one task at a time through submit, wait, fetch, extract and plot.
///
/// Holds no per-run state: every call tracks exactly one task from
/// submission to result, and each step awaits the previous one.
pub struct Orchestrator {
    api: Arc<dyn AnalysisApi>,
    poll: PollPolicy,
    events: Option<Arc<EventBus>>,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn AnalysisApi>, poll: PollPolicy) -> Self {
        Self {
            api,
            poll,
            events: None,
        }
    }

    /// Publish progress on `events` during every run.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn run(
        &self,
        request: &AnalysisRequest,
        strategy: Strategy,
    ) -> Result<Outcome, AnalysisError> {
        match strategy {
            Strategy::Plot => self.run_analysis(request).await.map(Outcome::Plot),
            Strategy::Samples { count } => {
                self.run_sampling(request, count).await.map(Outcome::Samples)
            }
        }
    }

    /// Run `request` and return a plot of the last distribution it printed.
    pub async fn run_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<PlotResource, AnalysisError> {
        let (task_id, stdout) = self.execute(request).await?;

        let value = extract::last_ux_value(&stdout)?;
        info!(task_id = %task_id, value = %value.value, "plotting final Ux value");
        self.emit(Event::ValueSelected {
            task_id: task_id.clone(),
            value: value.value.clone(),
        });

        let plot = self
            .api
            .request_plot(&value.ux_string)
            .await
            .map_err(AnalysisError::PlotRequest)?;

        self.emit(Event::Finished { task_id });
        Ok(plot)
    }

    /// Run `request` and sample the last `<ValueID>` it printed.
    pub async fn run_sampling(
        &self,
        request: &AnalysisRequest,
        count: usize,
    ) -> Result<ValueSamples, AnalysisError> {
        let (task_id, stdout) = self.execute(request).await?;

        let value_id = extract::last_value_id(&stdout)?;
        info!(task_id = %task_id, value_id = %value_id, count, "sampling value");
        self.emit(Event::ValueSelected {
            task_id: task_id.clone(),
            value: value_id.clone(),
        });

        let samples = self
            .api
            .value_samples(&task_id, &value_id, count)
            .await
            .map_err(|source| AnalysisError::Samples {
                value_id: value_id.clone(),
                source,
            })?;

        self.emit(Event::Finished { task_id });
        Ok(ValueSamples { value_id, samples })
    }

    /// Submit `request`. Only an HTTP 202 counts as accepted.
    pub async fn submit(&self, request: &AnalysisRequest) -> Result<Task, AnalysisError> {
        let task = self
            .api
            .submit_task(request)
            .await
            .map_err(AnalysisError::Submission)?;
        info!(task_id = %task.id, status = %task.status, "task submitted");
        self.emit(Event::Submitted {
            task_id: task.id.clone(),
            status: task.status.clone(),
        });
        Ok(task)
    }

    /// One status check, without waiting.
    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatus, AnalysisError> {
        self.api
            .task_status(task_id)
            .await
            .map_err(|source| AnalysisError::StatusFetch {
                task_id: task_id.to_string(),
                source,
            })
    }

    /// Submit, wait for a terminal status, and download stdout.
    async fn execute(&self, request: &AnalysisRequest) -> Result<(String, String), AnalysisError> {
        let task = self.submit(request).await?;
        let status = self.wait_for_terminal(&task).await?;
        let stdout = self.collect_stdout(&task.id, &status).await?;
        Ok((task.id, stdout))
    }

    fn emit(&self, event: Event) {
        if let Some(bus) = &self.events {
            bus.emit(event);
        }
    }
}
