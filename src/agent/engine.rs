//! The exploration loop: capture, decide, act, one round at a time.
//!
//! Exactly one device and one oracle conversation are driven strictly
//! sequentially; every suspension point is awaited to completion before the
//! round proceeds. Each action gets a single attempt: after a partial
//! failure the device state is not assumed safe to continue from, so the
//! session ends instead of retrying.

use std::time::Duration;

use crate::actions::parser;
use crate::agent::logbook::{LogEntry, Logbook};
use crate::agent::state::{Addressing, SessionState, SessionStatus};
use crate::agent::workspace::Workspace;
use crate::config::{ActionsConfig, AppConfig};
use crate::console;
use crate::device::DeviceController;
use crate::errors::{ScoutError, ScoutResult};
use crate::executor::{DispatchError, Dispatcher, Outcome};
use crate::llm::VisionModel;
use crate::perception::grid::{draw_grid_overlay, GridSpec};
use crate::perception::types::Observation;
use crate::prompts;

pub struct Explorer<D, M> {
    device: D,
    oracle: M,
    actions: ActionsConfig,
    max_rounds: u32,
    request_interval: Duration,
    workspace: Workspace,
    logbook: Logbook,
}

/// Final outcome of a session, reported to the operator.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub status: SessionStatus,
    pub rounds: u32,
}

impl<D: DeviceController, M: VisionModel> Explorer<D, M> {
    pub fn new(device: D, oracle: M, config: &AppConfig, workspace: Workspace) -> Self {
        let logbook = Logbook::new(workspace.explore_log.clone());
        Self {
            device,
            oracle,
            actions: config.actions.clone(),
            max_rounds: config.session.max_rounds,
            request_interval: Duration::from_secs(config.session.request_interval_secs),
            workspace,
            logbook,
        }
    }

    /// Run a full session for `task`. Returns `Err` only for faults outside
    /// the session state machine (e.g. the log file became unwritable);
    /// oracle, parse and device failures all end in a terminal status.
    pub async fn run(&self, task: &str) -> ScoutResult<SessionReport> {
        let mut state = SessionState::new(task);
        let (width, height) = self.device.screen_size().await?;

        while state.round < self.max_rounds {
            state.round += 1;
            console::info(&format!("Round {}", state.round));
            tracing::info!(round = state.round, "round started");

            let obs = match self.observe(state.round, state.addressing, width, height).await {
                Ok(obs) => obs,
                Err(e) => {
                    console::error(&format!("ERROR: observation failed: {e}"));
                    tracing::error!(error = %e, "observation failed");
                    state.status = SessionStatus::FailedExecution;
                    break;
                }
            };

            let prompt = match state.addressing {
                Addressing::Grounded => {
                    prompts::exploration_prompt(&state.task, &state.history, &self.actions)
                }
                Addressing::Grid => {
                    prompts::grid_prompt(&state.task, &state.history, &self.actions)
                }
            };

            console::info("Thinking about what to do in the next step...");
            let reply = match self
                .oracle
                .get_response(&prompt, std::slice::from_ref(&obs.prompt_image))
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    console::error(&e.to_string());
                    tracing::error!(error = %e, "oracle call failed");
                    state.status = SessionStatus::FailedOracle;
                    break;
                }
            };

            // Logged on every oracle success, regardless of how the round
            // ends afterwards.
            self.logbook.append(&LogEntry {
                step: state.round,
                prompt,
                image: image_name(&obs),
                response: reply.clone(),
            })?;

            let action = parser::parse_response(&reply);
            tracing::info!(?action, "action parsed");

            let dispatcher = Dispatcher::new(&self.device, &self.oracle);
            match dispatcher.dispatch(&action, &obs).await {
                Ok(Outcome::TaskComplete) => {
                    state.status = SessionStatus::Completed;
                    break;
                }
                Ok(Outcome::Rejected(raw)) => {
                    console::error(&format!("ERROR: unrecognized oracle reply: {raw}"));
                    tracing::error!("unrecognized oracle reply");
                    state.status = SessionStatus::FailedOracle;
                    break;
                }
                Ok(Outcome::GridRequested) => {
                    state.addressing = Addressing::Grid;
                    state.history = "Requested a grid overlay on the screen.".into();
                    tracing::info!("switching to grid addressing");
                }
                Ok(Outcome::Advanced) => {
                    if let Some(summary) = parser::extract_summary(&reply) {
                        state.history = summary;
                    }
                }
                Err(e @ DispatchError::Device { .. }) => {
                    console::error(&format!("ERROR: {e}"));
                    tracing::error!(error = %e, "action execution failed");
                    state.status = SessionStatus::FailedExecution;
                    break;
                }
                Err(e) => {
                    console::error(&format!("ERROR: {e}"));
                    tracing::error!(error = %e, "oracle-side dispatch failure");
                    state.status = SessionStatus::FailedOracle;
                    break;
                }
            }

            tokio::time::sleep(self.request_interval).await;
        }

        if !state.status.is_terminal() {
            state.status = SessionStatus::MaxRoundsReached;
        }
        tracing::info!(
            session = %self.workspace.task_name,
            status = ?state.status,
            rounds = state.round,
            "session ended"
        );
        Ok(SessionReport {
            status: state.status,
            rounds: state.round,
        })
    }

    /// Capture this round's screenshot; in grid mode also derive the grid
    /// partition from the image dimensions and render the numbered overlay.
    async fn observe(
        &self,
        round: u32,
        addressing: Addressing,
        width: u32,
        height: u32,
    ) -> ScoutResult<Observation> {
        let screenshot = self
            .device
            .capture_screenshot(&round.to_string(), &self.workspace.task_dir)
            .await?;

        let (prompt_image, grid) = match addressing {
            Addressing::Grounded => (screenshot.clone(), None),
            Addressing::Grid => {
                let (img_w, img_h) = image::image_dimensions(&screenshot).map_err(|e| {
                    ScoutError::Perception(format!("read {}: {e}", screenshot.display()))
                })?;
                let spec = GridSpec::compute(img_w, img_h);
                let overlay = self.workspace.task_dir.join(format!("{round}_grid.png"));
                draw_grid_overlay(&screenshot, &overlay, &spec)?;
                (overlay, Some(spec))
            }
        };

        Ok(Observation {
            round,
            screenshot,
            prompt_image,
            width,
            height,
            grid,
            elements: Vec::new(),
        })
    }
}

fn image_name(obs: &Observation) -> String {
    obs.prompt_image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.png", obs.round))
}
