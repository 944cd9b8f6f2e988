//! JSON snapshot of one collection run.
//!
//! The file body is exactly what `GET /api/editorials` would have returned
//! for the same date and source.

use crate::models::EditorialsResponse;
use crate::utils::ensure_writable_dir;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument};

/// Write `response` to `{json_output_dir}/{date}.json`, replacing any earlier
/// snapshot for that date. Returns the written path.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_response(
    response: &EditorialsResponse,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(response)?;

    if let Err(e) = ensure_writable_dir(json_output_dir).await {
        error!(error = %e, "JSON output directory is not writable");
        return Err(e);
    }

    let path = Path::new(json_output_dir).join(format!("{}.json", response.date));
    fs::write(&path, json).await?;
    info!(path = %path.display(), total = response.total, "Wrote editorials JSON");

    Ok(path)
}

/// Print `response` to stdout as pretty JSON.
pub async fn print_response(response: &EditorialsResponse) -> Result<(), Box<dyn Error>> {
    let mut json = serde_json::to_string_pretty(response)?;
    json.push('\n');
    let mut out = tokio::io::stdout();
    out.write_all(json.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_response_uses_date_file_name() {
        let dir = std::env::temp_dir().join(format!("daily_editorials_test_{}", std::process::id()));
        let dir_str = dir.to_string_lossy().to_string();
        let resp = EditorialsResponse::empty("2026-02-12", None);

        let path = write_response(&resp, &dir_str).await.unwrap();
        assert_eq!(path, dir.join("2026-02-12.json"));

        let body: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(body["date"], "2026-02-12");
        assert_eq!(body["total"], 0);

        fs::remove_dir_all(&dir).await.unwrap();
    }
}
