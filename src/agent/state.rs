use serde::{Deserialize, Serialize};

/// Lifecycle states of one exploration session. `Running` is the only
/// non-terminal state; every transition out of it ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    MaxRoundsReached,
    FailedExecution,
    FailedOracle,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        self != SessionStatus::Running
    }
}

/// How screen positions are addressed in prompts and replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Normalized 0–1000 coordinates grounded by the oracle.
    Grounded,
    /// Numbered grid overlay; positions are cell + sub-area.
    Grid,
}

/// Mutable per-session state, threaded explicitly through each round so the
/// state machine is unit-testable without a live device or oracle.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub task: String,
    pub round: u32,
    /// Accumulated description of past actions, fed into the next prompt.
    pub history: String,
    pub status: SessionStatus,
    pub addressing: Addressing,
}

impl SessionState {
    pub fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
            round: 0,
            history: "None".into(),
            status: SessionStatus::Running,
            addressing: Addressing::Grounded,
        }
    }
}
