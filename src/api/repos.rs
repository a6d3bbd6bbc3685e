//! Repository lifecycle endpoints: upload, list, delete, documentation.

use std::io::{Cursor, Read};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

use crate::api::{error_response, AppState};
use crate::docs::render_report;
use crate::models::{IngestOutcome, RepoInfo};

/// POST /api/repos - Upload a zip archive and ingest it synchronously.
/// Responds only once the repository is fully queryable.
pub async fn upload_repo(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestOutcome>), (StatusCode, String)> {
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Request body is empty".to_string()));
    }

    let files = extract_archive(&body, state.engine.max_upload_bytes())?;
    let outcome = state.engine.ingest(files).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/repos - List stored repositories.
pub async fn list_repos(State(state): State<AppState>) -> Json<Vec<RepoInfo>> {
    Json(state.engine.list())
}

/// DELETE /api/repos/{id} - Remove a repository and its index.
pub async fn delete_repo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.engine.delete(id).map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/repos/{id}/docs - Generated documentation as JSON.
pub async fn get_docs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<crate::models::Documentation>, (StatusCode, String)> {
    let docs = state.engine.generate_docs(id).await.map_err(error_response)?;
    Ok(Json(docs))
}

/// GET /api/repos/{id}/docs/report - Documentation as a downloadable
/// plain-text report.
pub async fn get_docs_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let docs = state.engine.generate_docs(id).await.map_err(error_response)?;
    let report = render_report(&docs);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{id}-documentation.txt\""),
            ),
        ],
        report,
    ))
}

/// Decode the uploaded zip into (path, bytes) pairs. Directory entries and
/// paths escaping the archive root are skipped. The cumulative decompressed
/// size is bounded by `max_bytes` while inflating, so a high-ratio archive
/// cannot balloon in memory before the engine's own size check.
fn extract_archive(
    body: &[u8],
    max_bytes: u64,
) -> Result<Vec<(String, Vec<u8>)>, (StatusCode, String)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(body))
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid zip archive: {e}")))?;

    let too_large = || {
        (
            StatusCode::BAD_REQUEST,
            format!("Archive expands beyond the upload limit of {max_bytes} bytes"),
        )
    };

    let mut files = Vec::new();
    let mut total: u64 = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid zip entry: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        // enclosed_name rejects absolute paths and `..` traversal
        let Some(path) = entry.enclosed_name() else {
            tracing::warn!("skipping zip entry with unsafe path: {}", entry.name());
            continue;
        };
        let path = path.to_string_lossy().into_owned();

        // Declared size is checked up front; actual bytes are capped while
        // reading in case the header lies.
        if total.saturating_add(entry.size()) > max_bytes {
            return Err(too_large());
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        (&mut entry)
            .take(max_bytes - total + 1)
            .read_to_end(&mut data)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Corrupt zip entry: {e}")))?;
        total += data.len() as u64;
        if total > max_bytes {
            return Err(too_large());
        }
        files.push((path, data));
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn make_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            for (name, content) in entries {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_extract_reads_all_files() {
        let zip = make_zip(&[("a.py", "def f(): pass\n"), ("docs/b.md", "# Title\n")]);
        let files = extract_archive(&zip, 1 << 20).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].0, "a.py");
        assert_eq!(files[1].0, "docs/b.md");
        assert_eq!(files[0].1, b"def f(): pass\n");
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let result = extract_archive(b"definitely not a zip", 1 << 20);
        assert!(result.is_err());
        let (status, _) = result.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_extract_skips_traversal_paths() {
        let zip = make_zip(&[("../evil.py", "import os\n"), ("ok.py", "x = 1\n")]);
        let files = extract_archive(&zip, 1 << 20).unwrap();
        let names: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(names, vec!["ok.py"]);
    }

    #[test]
    fn test_extract_rejects_overexpanding_archive() {
        // 200 KiB of one repeated byte compresses to a few hundred bytes;
        // the limit applies to the decompressed size, not the upload size.
        let payload = "a".repeat(200 * 1024);
        let zip = make_zip(&[("big.txt", &payload)]);
        assert!(zip.len() < 4 * 1024);

        let result = extract_archive(&zip, 4 * 1024);
        let (status, message) = result.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("upload limit"));
    }

    #[test]
    fn test_extract_limit_counts_across_entries() {
        let zip = make_zip(&[("a.txt", "x".repeat(60).as_str()), ("b.txt", "y".repeat(60).as_str())]);
        assert!(extract_archive(&zip, 100).is_err());
        assert!(extract_archive(&zip, 120).is_ok());
    }
}
