use std::path::Path;

use crate::error::AppError;

pub const REPORT_HEADING: &str = "### 🧾 Final Diagnosis\n\n";

pub fn format_final(diagnosis: &str) -> String {
    format!("{REPORT_HEADING}{diagnosis}")
}

/// Drops characters the persisted report cannot carry instead of failing the
/// analysis: control characters (newlines and tabs excepted), the replacement
/// character, and Unicode noncharacters.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|&c| is_encodable(c)).collect()
}

fn is_encodable(c: char) -> bool {
    if matches!(c, '\n' | '\r' | '\t') {
        return true;
    }
    if c.is_control() || c == '\u{FFFD}' {
        return false;
    }
    let v = c as u32;
    !((0xFDD0..=0xFDEF).contains(&v) || (v & 0xFFFE) == 0xFFFE)
}

/// Truncating write to the single well-known result path. The previous report
/// is always replaced whole; there is no append path and no locking
/// (single-writer usage).
pub async fn write_report(path: &Path, report: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, report.as_bytes()).await?;

    tracing::info!(path = %path.display(), bytes = report.len(), "Report persisted");

    Ok(())
}
