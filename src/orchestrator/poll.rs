use tracing::{debug, info, warn};

use super::Orchestrator;
use crate::error::{AnalysisError, NoResultReason};
use crate::events::Event;
use crate::task::{Task, TaskStatus};

impl Orchestrator {
    /// Check the task's status until it is terminal.
    ///
    /// Waits before every check according to the poll policy and gives up
    /// with [`AnalysisError::Timeout`] after `max_attempts` checks. A task
    /// that was already terminal when submitted is not polled at all.
    pub async fn wait_for_terminal(&self, task: &Task) -> Result<TaskStatus, AnalysisError> {
        if task.status.is_terminal() {
            return Ok(task.status.clone());
        }

        let mut last_status = task.status.clone();
        for attempt in 0..self.poll.max_attempts {
            tokio::time::sleep(self.poll.delay_for(attempt)).await;

            let status = self.task_status(&task.id).await?;
            debug!(task_id = %task.id, status = %status, attempt = attempt + 1, "status checked");
            if status != last_status {
                info!(task_id = %task.id, from = %last_status, to = %status, "task status changed");
            }
            self.emit(Event::StatusChecked {
                task_id: task.id.clone(),
                status: status.clone(),
                attempt: attempt + 1,
            });

            if status.is_terminal() {
                return Ok(status);
            }
            last_status = status;
        }

        Err(AnalysisError::Timeout {
            task_id: task.id.clone(),
            attempts: self.poll.max_attempts,
            last_status,
        })
    }

    /// Download the stdout of a task that ended with `status`.
    ///
    /// Only Completed tasks have output. An empty stdout is fetched again,
    /// up to `stdout_retries` more times, before it counts as no result.
    /// Whitespace-only output is returned as is and left to extraction.
    pub async fn collect_stdout(
        &self,
        task_id: &str,
        status: &TaskStatus,
    ) -> Result<String, AnalysisError> {
        let no_result = |reason| AnalysisError::NoResult {
            task_id: task_id.to_string(),
            reason,
        };

        if *status != TaskStatus::Completed {
            return Err(no_result(NoResultReason::Ended(status.clone())));
        }

        let attempts = self.poll.stdout_retries.saturating_add(1);
        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.poll.delay_for(attempt - 1)).await;
            }

            let outputs = self
                .api
                .task_outputs(task_id)
                .await
                .map_err(|e| no_result(NoResultReason::Outputs(e)))?;
            let Some(url) = outputs.stdout else {
                return Err(no_result(NoResultReason::MissingStdout));
            };
            let stdout = self
                .api
                .fetch_stdout(&url)
                .await
                .map_err(|e| no_result(NoResultReason::StdoutDownload(e)))?;

            if !stdout.is_empty() {
                self.emit(Event::StdoutFetched {
                    task_id: task_id.to_string(),
                    bytes: stdout.len(),
                });
                return Ok(stdout);
            }
            warn!(task_id, attempt = attempt + 1, "stdout is empty");
        }

        Err(no_result(NoResultReason::EmptyStdout { attempts }))
    }
}
