use std::path::Path;

use axum::{Json, extract::Multipart, extract::State};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::routes::ShellState;
use crate::telemetry::metrics::UPLOADS_RECEIVED;

/// Accepts one text file under the multipart field `file`, stores it in the
/// upload directory under its original name (same-name uploads overwrite), and
/// moves the shell to `Uploaded`. Analysis never starts here.
pub async fn upload_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(sanitized_filename)
            .ok_or_else(|| AppError::Validation("file field must carry a filename".into()))?;
        if filename.is_empty() {
            return Err(AppError::Validation("invalid filename".into()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
        upload = Some((filename, data.to_vec()));
    }

    let Some((filename, data)) = upload else {
        return Err(AppError::Validation("missing multipart field 'file'".into()));
    };
    if data.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".into()));
    }

    let document = String::from_utf8(data.clone())
        .map_err(|_| AppError::Validation("uploaded file must be UTF-8 text".into()))?;

    {
        let shell = state.shell.read().await;
        if matches!(*shell, ShellState::Analyzing { .. }) {
            return Err(AppError::Conflict("an analysis is already running".into()));
        }
    }

    let path = Path::new(&state.config.upload_dir).join(&filename);
    tokio::fs::write(&path, &data).await?;

    UPLOADS_RECEIVED.add(1, &[]);
    tracing::info!(
        filename = %filename,
        bytes = data.len(),
        "Report uploaded"
    );

    let mut shell = state.shell.write().await;
    *shell = ShellState::Uploaded {
        filename: filename.clone(),
        document,
    };

    Ok(Json(json!({
        "status": "uploaded",
        "filename": filename,
        "bytes": data.len(),
    })))
}

/// Keeps only the final path component so an uploaded name cannot escape the
/// upload directory.
fn sanitized_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
