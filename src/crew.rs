//! The crew: runs tasks one at a time in their declared order.
//!
//! Each task sees the results of every task completed before it. The first
//! failure aborts the run; nothing is retried and nothing after the failing
//! task executes. The terminal task's result may be persisted, and that file
//! is the only artifact a run produces.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::agent::{Agent, AgentError};
use crate::context::{ContextEntry, ExecutionContext};
use crate::events::{CrewEvent, EventSink};
use crate::persist::{atomic_write, sha256_hex};
use crate::task::{Task, TaskError, TaskOutput};
use crate::tools::truncate;

#[derive(Debug, Error)]
pub enum CrewError {
    #[error("Crew has no tasks")]
    NoTasks,

    #[error("Task '{task}' is assigned to '{role}', which is not one of the crew's agents")]
    UnknownAgent { task: String, role: String },

    #[error("Task '{task}' declares an output file, but only the final task may persist an artifact")]
    MisplacedOutput { task: String },

    #[error("Crew has already run")]
    AlreadyRun,

    #[error("Task '{task}' (#{index}) failed: {source}")]
    TaskFailed {
        index: usize,
        task: String,
        #[source]
        source: AgentError,
        /// Results of the tasks that completed before the failure
        context: ExecutionContext,
    },

    #[error("Task '{task}' finished but writing {path} failed: {source}")]
    Persist {
        task: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
        context: ExecutionContext,
    },

    #[error(transparent)]
    Task(#[from] TaskError),
}

impl CrewError {
    /// Name of the task that aborted the run, if a task did.
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            Self::TaskFailed { task, .. } | Self::Persist { task, .. } => Some(task),
            _ => None,
        }
    }

    /// Results accumulated before the run aborted.
    pub fn partial_context(&self) -> Option<&ExecutionContext> {
        match self {
            Self::TaskFailed { context, .. } | Self::Persist { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// The persisted terminal result.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub sha256: String,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct CrewOutput {
    /// Result of the terminal task
    pub final_output: String,
    /// Every task's output, in execution order
    pub tasks: Vec<TaskOutput>,
    pub artifact: Option<Artifact>,
}

pub struct Crew {
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    verbose: bool,
    events: EventSink,
    has_run: bool,
}

impl Crew {
    /// Assemble a crew, checking that it can run.
    ///
    /// # Errors
    ///
    /// - `CrewError::NoTasks` if `tasks` is empty
    /// - `CrewError::UnknownAgent` if a task's agent is not in `agents`
    /// - `CrewError::MisplacedOutput` if a non-terminal task declares an output file
    pub fn new(agents: Vec<Arc<Agent>>, tasks: Vec<Task>, verbose: bool) -> Result<Self, CrewError> {
        if tasks.is_empty() {
            return Err(CrewError::NoTasks);
        }

        for task in &tasks {
            if !agents.iter().any(|a| Arc::ptr_eq(a, task.agent())) {
                return Err(CrewError::UnknownAgent {
                    task: task.name().to_string(),
                    role: task.agent().role().to_string(),
                });
            }
        }

        let last = tasks.len() - 1;
        if let Some(task) = tasks[..last].iter().find(|t| t.output_file().is_some()) {
            return Err(CrewError::MisplacedOutput {
                task: task.name().to_string(),
            });
        }

        Ok(Self {
            agents,
            tasks,
            verbose,
            events: EventSink::new(),
            has_run: false,
        })
    }

    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Stream progress events. Subscribe before calling [`Crew::run`].
    pub fn subscribe(&self) -> broadcast::Receiver<CrewEvent> {
        self.events.subscribe()
    }

    /// Run every task in order and return the terminal task's result.
    pub async fn run(&mut self) -> Result<CrewOutput, CrewError> {
        if self.has_run {
            return Err(CrewError::AlreadyRun);
        }
        self.has_run = true;

        let total = self.tasks.len();
        let mut context = ExecutionContext::new();
        let mut outputs = Vec::with_capacity(total);
        let mut artifact = None;

        for index in 0..total {
            let agent = Arc::clone(self.tasks[index].agent());
            let name = self.tasks[index].name().to_string();

            self.tasks[index].start()?;
            self.progress(format!(
                "[{}/{}] Task '{}' started by {}",
                index + 1,
                total,
                name,
                agent.role()
            ));
            self.events.emit(CrewEvent::TaskStarted {
                index,
                task: name.clone(),
                agent_role: agent.role().to_string(),
            });

            let output = match agent.execute(&self.tasks[index], &context, &self.events).await {
                Ok(output) => output,
                Err(e) => {
                    self.abort(index, &e.to_string())?;
                    return Err(CrewError::TaskFailed {
                        index,
                        task: name,
                        source: e,
                        context,
                    });
                }
            };

            if let Some(path) = self.tasks[index].output_file().map(|p| p.to_path_buf()) {
                if let Err(e) = atomic_write(&path, output.raw.as_bytes()).await {
                    self.abort(index, &e.to_string())?;
                    return Err(CrewError::Persist {
                        task: name,
                        path,
                        source: e,
                        context,
                    });
                }

                let sha256 = sha256_hex(output.raw.as_bytes());
                tracing::info!("Wrote {} ({} bytes)", path.display(), output.raw.len());
                self.events.emit(CrewEvent::ArtifactWritten {
                    path: path.clone(),
                    sha256: sha256.clone(),
                });
                artifact = Some(Artifact { path, sha256 });
            }

            context.push(ContextEntry {
                task: name.clone(),
                agent_role: output.agent_role.clone(),
                output: output.raw.clone(),
            });

            self.progress(format!(
                "[{}/{}] Task '{}' completed: {}",
                index + 1,
                total,
                name,
                truncate(output.raw.trim(), 200)
            ));
            self.events.emit(CrewEvent::TaskCompleted {
                index,
                task: name,
                output_chars: output.raw.chars().count(),
            });

            self.tasks[index].complete(output.clone())?;
            outputs.push(output);
        }

        let final_output = outputs
            .last()
            .map(|o| o.raw.clone())
            .unwrap_or_default();

        Ok(CrewOutput {
            final_output,
            tasks: outputs,
            artifact,
        })
    }

    fn abort(&mut self, index: usize, reason: &str) -> Result<(), TaskError> {
        let task = &mut self.tasks[index];
        tracing::error!("Task '{}' failed: {}", task.name(), reason);
        self.events.emit(CrewEvent::TaskFailed {
            index,
            task: task.name().to_string(),
            error: reason.to_string(),
        });
        task.fail(reason)
    }

    fn progress(&self, message: String) {
        if self.verbose {
            tracing::info!("{}", message);
        } else {
            tracing::debug!("{}", message);
        }
    }
}

impl fmt::Debug for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crew")
            .field("agents", &self.agents)
            .field("tasks", &self.tasks)
            .field("verbose", &self.verbose)
            .field("has_run", &self.has_run)
            .finish()
    }
}
