use super::{CheckpointError, CheckpointSource};
use crate::github_client::{GithubError, Workflow, WorkflowRun};
use crate::models::checkpoint::{Checkpoint, Origin};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Which past runs count as a sync point.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RunPredicate {
    /// Completed with a `success` conclusion.
    Success,
    /// Reached a terminal state, whatever the outcome.
    Completed,
}

impl RunPredicate {
    pub fn matches(&self, run: &WorkflowRun) -> bool {
        let completed = run.status.as_deref() == Some("completed");

        match self {
            RunPredicate::Success => completed && run.conclusion.as_deref() == Some("success"),
            RunPredicate::Completed => completed,
        }
    }

    /// Value of the runs endpoint's `status` filter selecting the same runs.
    pub fn status_filter(&self) -> &'static str {
        match self {
            RunPredicate::Success => "success",
            RunPredicate::Completed => "completed",
        }
    }
}

impl FromStr for RunPredicate {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "completed" => Ok(Self::Completed),
            _ => Err(()),
        }
    }
}

#[async_trait]
pub trait RunHistory: Send + Sync {
    async fn workflows(&self) -> Result<Vec<Workflow>, GithubError>;

    /// Most recent runs of `workflow_id`, narrowed to `predicate` by the server.
    async fn runs(
        &self,
        workflow_id: u64,
        predicate: RunPredicate,
    ) -> Result<Vec<WorkflowRun>, GithubError>;
}

/// Reconstructs the checkpoint from the CI system's record of earlier runs,
/// so nothing has to be written at the end of an invocation.
pub struct RunHistoryCheckpoint<H> {
    history: H,
    workflow: String,
    predicate: RunPredicate,
    current_run_id: Option<u64>,
}

impl<H: RunHistory> RunHistoryCheckpoint<H> {
    pub fn new(
        history: H,
        workflow: String,
        predicate: RunPredicate,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            history,
            workflow,
            predicate,
            current_run_id,
        }
    }

    /// Workflows without a `name:` key are reported under their file path.
    fn find_workflow<'a>(&self, workflows: &'a [Workflow]) -> Option<&'a Workflow> {
        workflows
            .iter()
            .find(|workflow| workflow.name == self.workflow)
            .or_else(|| workflows.iter().find(|workflow| workflow.path == self.workflow))
    }

    pub fn select_run<'a>(&self, runs: &'a [WorkflowRun]) -> Option<&'a WorkflowRun> {
        runs.iter()
            .filter(|run| Some(run.id) != self.current_run_id)
            .filter(|run| self.predicate.matches(run))
            .max_by_key(|run| run.started_at())
    }
}

#[async_trait]
impl<H: RunHistory> CheckpointSource for RunHistoryCheckpoint<H> {
    async fn resolve(&self, now: DateTime<Utc>) -> Result<Checkpoint, CheckpointError> {
        let workflows = self.history.workflows().await?;

        let workflow = match self.find_workflow(&workflows) {
            Some(workflow) => workflow,
            None => {
                log::warn!(
                    "Workflow {:?} not found, using the default window",
                    self.workflow
                );

                return Ok(Checkpoint::default_for(now));
            }
        };

        let runs = self.history.runs(workflow.id, self.predicate).await?;

        match self.select_run(&runs) {
            Some(run) => {
                log::info!(
                    "Using run {} of workflow {} as checkpoint",
                    run.id,
                    workflow.id
                );

                Ok(Checkpoint::new(run.started_at(), Origin::RunHistory))
            }
            None => {
                log::warn!(
                    "No {:?} runs of workflow {}, using the default window",
                    self.predicate,
                    workflow.id
                );

                Ok(Checkpoint::default_for(now))
            }
        }
    }

    /// The CI system records this run itself.
    async fn store(&self, _checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "run_history"
    }
}
