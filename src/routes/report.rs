use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::routes::ShellState;

/// The most recent terminal outcome. Non-terminal states report 404 with the
/// current status so a poller can tell "not yet" from "never uploaded".
pub async fn get_report(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let shell = state.shell.read().await;
    match &*shell {
        ShellState::Complete { filename, analysis } => Ok(Json(json!({
            "status": "complete",
            "filename": filename,
            "analysis": analysis,
        }))),
        ShellState::Failed { filename, error } => Ok(Json(json!({
            "status": "failed",
            "filename": filename,
            "error": error,
        }))),
        other => Err(AppError::NotFound(format!(
            "no diagnosis available (status: {})",
            other.status()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Analysis;

    #[test]
    fn test_failed_body_shape() {
        let body = json!({
            "status": "failed",
            "filename": "report.txt",
            "error": "LLM error: backend unavailable",
        });
        assert_eq!(body["status"], "failed");
        assert!(body["error"].as_str().unwrap().contains("backend"));
    }

    #[test]
    fn test_analysis_serializes_report_field() {
        let analysis = Analysis {
            report: "### 🧾 Final Diagnosis\n\nCombined: stable".to_string(),
            roles_consulted: vec!["cardiologist", "psychologist", "pulmonologist"],
            duration_ms: 12,
            completed_at: chrono::Utc::now(),
            trace_id: "0".repeat(32),
        };
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(
            value["report"],
            "### 🧾 Final Diagnosis\n\nCombined: stable"
        );
        assert_eq!(value["roles_consulted"].as_array().unwrap().len(), 3);
    }
}
