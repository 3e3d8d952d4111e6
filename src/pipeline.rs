use crate::api::types::{Project, Task};
use crate::api::TaskApi;
use crate::config::PresenterConfig;
use crate::engine::{
    fetcher, resolver, submitter, BatchChoice, Phase, Scope, Selector, Session, SubmitOutcome,
};
use crate::tui::state::{AppState, TaskView, View};
use crate::tui::TuiCommand;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Result of one Resolver -> Fetcher -> Selector pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Cycle {
    /// A task was selected and is now on screen.
    Ready(Task),
    /// No eligible task is left.
    Finished,
    /// The configured project does not exist.
    NoProject,
}

/// Owns the visitor's session and runs the presentation cycle against the
/// remote service.
pub struct Presenter {
    api: Arc<dyn TaskApi>,
    config: PresenterConfig,
    selector: Selector,
    rng: StdRng,
    session: Session,
}

impl Presenter {
    pub fn new(api: Arc<dyn TaskApi>, config: PresenterConfig) -> Self {
        Self {
            api,
            config,
            selector: Selector::new(),
            rng: StdRng::from_entropy(),
            session: Session::default(),
        }
    }

    /// Deterministic presenter for tests and replays.
    pub fn with_seed(api: Arc<dyn TaskApi>, config: PresenterConfig, seed: u64) -> Self {
        Self {
            api,
            config,
            selector: Selector::with_seed(seed),
            rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
            session: Session::default(),
        }
    }

    pub fn config(&self) -> &PresenterConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolved once per session; later cycles reuse it.
    async fn project(&mut self) -> Result<Option<Project>> {
        if let Some(project) = &self.session.project {
            return Ok(Some(project.clone()));
        }
        let found = resolver::resolve_project(&*self.api, &self.config.project).await?;
        self.session.project = found.clone();
        Ok(found)
    }

    /// The batch is chosen on the first cycle and kept for the visit.
    async fn scope(&mut self, project_id: u64) -> Result<Scope> {
        if self.session.batch == BatchChoice::Undecided {
            self.session.batch = if self.config.use_batches {
                match fetcher::choose_batch(&*self.api, project_id, &mut self.rng).await? {
                    Some(id) => BatchChoice::Batch(id),
                    None => BatchChoice::Unbatched,
                }
            } else {
                BatchChoice::Unbatched
            };
        }
        Ok(Scope {
            project_id,
            batch_id: self.session.batch.batch_id(),
        })
    }

    /// Run one Resolver -> Fetcher -> Selector pass and put the chosen task on
    /// screen.
    ///
    /// The task on screen is dropped first, so nothing stays answerable when
    /// the cycle ends without a new one (including on error).
    pub async fn next_task(&mut self) -> Result<Cycle> {
        self.session.clear();

        let Some(project) = self.project().await? else {
            return Ok(Cycle::NoProject);
        };

        let scope = self.scope(project.id).await?;
        let eligible = fetcher::fetch_candidates(&*self.api, &scope).await?;
        if eligible.is_empty() {
            tracing::info!(project_id = scope.project_id, batch_id = ?scope.batch_id, "no work left");
            return Ok(Cycle::Finished);
        }

        let previous = self.session.previous_task_id;
        let Some(task) = self.selector.select(&eligible, previous, &scope).cloned() else {
            return Ok(Cycle::Finished);
        };
        tracing::info!(
            task_id = task.id,
            previous = ?previous,
            candidates = eligible.len(),
            "task selected"
        );
        self.session.show(task.clone());
        Ok(Cycle::Ready(task))
    }

    /// Submit `answer` for the task on screen.
    ///
    /// After a [`SubmitOutcome::RunFailed`] the transition is not repeated;
    /// answering again only retries the run.
    pub async fn submit(&mut self, answer: &str) -> Result<SubmitOutcome> {
        let Some(shown) = self.session.current.as_mut() else {
            anyhow::bail!("no task is on screen");
        };
        if matches!(shown.phase, Phase::Submitting | Phase::Completed) {
            anyhow::bail!("task {} is already {:?}", shown.task.id, shown.phase);
        }
        shown.phase = Phase::Submitting;

        let outcome = if shown.transitioned {
            match submitter::record_run(&*self.api, &shown.task, answer).await {
                Ok(run) => SubmitOutcome::Completed {
                    task: shown.task.clone(),
                    run,
                },
                Err(error) => SubmitOutcome::RunFailed {
                    task: shown.task.clone(),
                    error,
                },
            }
        } else {
            submitter::submit_answer(&*self.api, &shown.task, answer).await
        };

        match &outcome {
            SubmitOutcome::Completed { .. } | SubmitOutcome::AlreadyCompleted { .. } => {
                shown.phase = Phase::Completed;
            }
            SubmitOutcome::TransitionFailed { .. } => shown.phase = Phase::SubmitFailed,
            SubmitOutcome::RunFailed { task, .. } => {
                shown.phase = Phase::SubmitFailed;
                shown.transitioned = true;
                shown.task = task.clone();
            }
        }
        Ok(outcome)
    }
}

/// Presenter loop: load a task, wait for commands from the TUI, publish state.
pub async fn run_presenter(
    mut presenter: Presenter,
    state_tx: watch::Sender<AppState>,
    mut cmd_rx: mpsc::Receiver<TuiCommand>,
) -> Result<()> {
    let success_display = Duration::from_millis(presenter.config().success_display_ms);
    load_next(&mut presenter, &state_tx).await;

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            TuiCommand::Quit => break,
            TuiCommand::Reload => load_next(&mut presenter, &state_tx).await,
            TuiCommand::Answer { task_id, index } => {
                // Key presses queue up while a submission runs; only answer
                // the task that is actually on screen.
                let on_screen = state_tx.borrow().view == View::Task;
                if !on_screen || !presenter.session().answerable(task_id) {
                    tracing::debug!(task_id, "stale answer dropped");
                    continue;
                }
                let Some(answer) = presenter.config().answers.get(index).cloned() else {
                    continue;
                };

                state_tx.send_modify(|s| {
                    if let Some(t) = s.task.as_mut() {
                        t.phase = Phase::Submitting;
                    }
                    s.last_error = None;
                });

                match presenter.submit(&answer).await {
                    Ok(SubmitOutcome::Completed { run, .. }) => {
                        let run_id = run.id.map_or_else(|| "?".to_string(), |id| id.to_string());
                        state_tx.send_modify(|s| {
                            s.completed_count += 1;
                            if let Some(t) = s.task.as_mut() {
                                t.phase = Phase::Completed;
                            }
                            s.flash_success(success_display);
                            s.push_log(
                                "INFO",
                                format!("task {} answered \"{}\" (run {})", task_id, answer, run_id),
                            );
                        });
                        tokio::time::sleep(success_display).await;
                        load_next(&mut presenter, &state_tx).await;
                    }
                    Ok(SubmitOutcome::AlreadyCompleted { task_id }) => {
                        state_tx.send_modify(|s| {
                            s.push_log(
                                "WARN",
                                format!("task {} was completed by someone else, fetching another", task_id),
                            );
                        });
                        load_next(&mut presenter, &state_tx).await;
                    }
                    Ok(SubmitOutcome::TransitionFailed { task_id, error }) => {
                        let message = format!("{:#}", error);
                        state_tx.send_modify(|s| {
                            s.failed_count += 1;
                            if let Some(t) = s.task.as_mut() {
                                t.phase = Phase::SubmitFailed;
                            }
                            s.push_log("ERROR", format!("task {} not submitted: {}", task_id, message));
                            s.last_error = Some(message);
                        });
                    }
                    Ok(SubmitOutcome::RunFailed { task, error }) => {
                        let message = format!("{:#}", error);
                        state_tx.send_modify(|s| {
                            s.failed_count += 1;
                            if let Some(t) = s.task.as_mut() {
                                t.phase = Phase::SubmitFailed;
                            }
                            s.push_log(
                                "ERROR",
                                format!(
                                    "task {} completed but the answer was not recorded: {}",
                                    task.id, message
                                ),
                            );
                            s.last_error = Some(format!("{} (answer again to retry)", message));
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %format!("{:#}", e), "answer ignored");
                    }
                }
            }
        }
    }

    tracing::info!("presenter stopped");
    Ok(())
}

async fn load_next(presenter: &mut Presenter, state_tx: &watch::Sender<AppState>) {
    state_tx.send_modify(|s| s.view = View::Loading);

    let cycle = presenter.next_task().await;
    let description = presenter
        .session()
        .project
        .as_ref()
        .map(|p| p.description.clone());

    state_tx.send_modify(|s| {
        s.description = description;
        match cycle {
            Ok(Cycle::Ready(task)) => {
                s.view = View::Task;
                s.last_error = None;
                s.push_log("INFO", format!("showing task {}", task.id));
                s.task = Some(TaskView::new(&task, Phase::Shown));
            }
            Ok(Cycle::Finished) => {
                s.view = View::Finished;
                s.task = None;
                s.push_log("INFO", "no more tasks available".to_string());
            }
            Ok(Cycle::NoProject) => {
                s.view = View::NoProject;
                s.task = None;
                s.push_log("WARN", format!("project '{}' not found", s.project));
            }
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, "could not load a task");
                s.view = View::Error;
                s.task = None;
                s.push_log("ERROR", message.clone());
                s.last_error = Some(message);
            }
        }
    });
}
