use spin_sdk::http::Response;
use rust_embed::RustEmbed;
use mime_guess::from_path;

use crate::core::errors::ApiError;

#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

/// Serve `/static/<file>` from the embedded asset bundle.
pub fn serve_static(path: &str) -> anyhow::Result<Response> {
    let file_path = path.trim_start_matches("/static/");

    if file_path.is_empty() || file_path.contains("..") {
        return Ok(ApiError::NotFound("File not found".to_string()).into());
    }

    let file = match Assets::get(file_path) {
        Some(f) => f,
        None => return Ok(ApiError::NotFound("File not found".to_string()).into()),
    };

    let mime = from_path(file_path).first_or_octet_stream();

    Ok(Response::builder()
        .status(200)
        .header("content-type", mime.as_ref())
        .header("cache-control", "public, max-age=3600")
        .body(file.data.to_vec())
        .build())
}
