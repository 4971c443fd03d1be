pub mod analyze;
pub mod health;
pub mod report;
pub mod upload;

use crate::pipeline::Analysis;

/// Lifecycle of the single tracked analysis request:
/// `Idle → Uploaded → Analyzing → {Complete | Failed}`.
///
/// `Analyzing` is entered only on an explicit analyze call; the terminal
/// states keep the most recent outcome until the next upload replaces it.
#[derive(Debug, Clone, Default)]
pub enum ShellState {
    #[default]
    Idle,
    Uploaded {
        filename: String,
        document: String,
    },
    Analyzing {
        filename: String,
    },
    Complete {
        filename: String,
        analysis: Analysis,
    },
    Failed {
        filename: String,
        error: String,
    },
}

impl ShellState {
    pub fn status(&self) -> &'static str {
        match self {
            ShellState::Idle => "idle",
            ShellState::Uploaded { .. } => "uploaded",
            ShellState::Analyzing { .. } => "analyzing",
            ShellState::Complete { .. } => "complete",
            ShellState::Failed { .. } => "failed",
        }
    }
}
