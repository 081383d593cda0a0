//! Serves stored thumbnails from the assets root.

use crate::{errors::AppError, state::AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use std::io;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

const MAX_ASSET_NAME_LEN: usize = 255;

/// `GET /assets/{file}` as a streaming response.
pub async fn get_asset(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    ensure_asset_name_safe(&file_name)?;

    let path = state.assets_root.join(&file_name);
    let file = File::open(&path).await.map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => AppError::not_found(format!("asset `{file_name}` not found")),
        _ => {
            tracing::error!("Failed to open asset {:?}: {}", path, err);
            AppError::internal("failed to read asset")
        }
    })?;
    let size_bytes = file
        .metadata()
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
        .len();

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&file_name)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size_bytes));
    Ok(response)
}

/// Reject anything that could resolve outside the assets root.
fn ensure_asset_name_safe(name: &str) -> Result<(), AppError> {
    if name.is_empty() || name.len() > MAX_ASSET_NAME_LEN {
        return Err(AppError::bad_request("invalid asset name"));
    }
    if name.starts_with('.') || name.contains('/') || name.contains("..") {
        return Err(AppError::bad_request("invalid asset name"));
    }
    if name.bytes().any(|b| b.is_ascii_control() || b == b'\\') {
        return Err(AppError::bad_request("invalid asset name"));
    }
    Ok(())
}

fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_names() {
        assert!(ensure_asset_name_safe("0b5f3c0e-7d7e-4b52-9d8c-0e0b1b1c2a3d.png").is_ok());
        for bad in ["", "../videos.db", "a/b.png", ".tmp-123", "a\\b.png", "a\0.png"] {
            assert!(ensure_asset_name_safe(bad).is_err(), "{bad:?} accepted");
        }
        assert!(ensure_asset_name_safe(&"a".repeat(256)).is_err());
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for("x.jpg"), "image/jpeg");
        assert_eq!(content_type_for("x.PNG"), "image/png");
        assert_eq!(content_type_for("x"), "application/octet-stream");
    }
}
