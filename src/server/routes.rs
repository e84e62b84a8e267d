//! Route handlers. Thin by construction: decode the request, call the
//! engine, encode the result. All similarity logic lives below the
//! service layer.

use crate::engine::{CompareReport, Engine, QueryReport};
use crate::server::error::ServerError;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

static SERVER_START_TIME: Lazy<SystemTime> = Lazy::new(SystemTime::now);

pub async fn health(State(engine): State<Arc<Engine>>) -> Json<Value> {
    let stats = engine.stats();
    let uptime_seconds = SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Json(json!({
        "status": "ok",
        "database_size": stats.entries,
        "block_index_size": stats.block_index,
        "ctph_index_size": stats.ctph_index,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": uptime_seconds,
    }))
}

pub async fn file_report(
    State(engine): State<Arc<Engine>>,
    Path(digest): Path<String>,
) -> Result<Json<QueryReport>, ServerError> {
    let report = engine.query(&digest)?;
    Ok(Json(report))
}

pub async fn reload(State(engine): State<Arc<Engine>>) -> Result<Json<Value>, ServerError> {
    let stats = engine.reload().map_err(ServerError::Engine)?;
    info!(entries = stats.entries, "corpus reloaded via api");
    Ok(Json(json!({
        "status": "reloaded",
        "database_size": stats.entries,
    })))
}

pub async fn compare(
    State(engine): State<Arc<Engine>>,
    mut multipart: Multipart,
) -> Result<Json<CompareReport>, ServerError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut save_to_db = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServerError::BadRequest(format!("malformed multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .unwrap_or("unnamed-upload")
                    .to_string();
                let bytes = field.bytes().await.map_err(|err| {
                    ServerError::BadRequest(format!("failed to read upload: {err}"))
                })?;
                upload = Some((filename, bytes.to_vec()));
            }
            "save_to_db" => {
                let value = field.text().await.map_err(|err| {
                    ServerError::BadRequest(format!("failed to read save_to_db: {err}"))
                })?;
                save_to_db = matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "on" | "yes"
                );
            }
            // unknown parts are ignored so that clients can evolve
            _ => {}
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ServerError::BadRequest("missing 'file' part".to_string()))?;
    let report = engine.compare(&bytes, &filename, save_to_db)?;
    Ok(Json(report))
}
