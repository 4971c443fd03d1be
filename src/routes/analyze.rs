use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::pipeline::run_analysis;
use crate::routes::ShellState;

/// Runs the full analysis for the currently uploaded report. Only the
/// `Uploaded` state may enter `Analyzing`; the lock is released while the
/// pipeline runs so status stays readable.
pub async fn analyze_report(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let (filename, document) = {
        let mut shell = state.shell.write().await;
        match &*shell {
            ShellState::Uploaded { filename, document } => {
                let taken = (filename.clone(), document.clone());
                *shell = ShellState::Analyzing {
                    filename: taken.0.clone(),
                };
                taken
            }
            ShellState::Analyzing { .. } => {
                return Err(AppError::Conflict("an analysis is already running".into()));
            }
            _ => {
                return Err(AppError::Conflict(
                    "no uploaded report to analyze; upload a file first".into(),
                ));
            }
        }
    };

    tracing::info!(filename = %filename, "Analysis started");

    match run_analysis(&state.llm_client, &state.config, &document).await {
        Ok(analysis) => {
            let body = json!({
                "status": "complete",
                "filename": &filename,
                "analysis": &analysis,
            });
            let mut shell = state.shell.write().await;
            *shell = ShellState::Complete { filename, analysis };
            Ok(Json(body))
        }
        Err(err) => {
            let mut shell = state.shell.write().await;
            *shell = ShellState::Failed {
                filename,
                error: err.to_string(),
            };
            Err(err)
        }
    }
}
