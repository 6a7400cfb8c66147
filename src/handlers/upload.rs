// src/handlers/upload.rs

use std::collections::HashMap;

use axum::extract::{Multipart, multipart::MultipartError};
use axum::http::StatusCode;

use crate::{error::AppError, import::FileError};

/// A multipart upload: the `file` part plus any plain text fields.
#[derive(Debug, Default)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub fields: HashMap<String, String>,
}

impl Upload {
    /// Trimmed text field, `None` when absent or blank.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        AppError::BadRequest(format!("Invalid multipart data: {}", err.body_text()))
    }
}

fn too_large(max_bytes: usize) -> AppError {
    AppError::PayloadTooLarge(format!(
        "File size exceeds {}MB limit",
        max_bytes / (1024 * 1024)
    ))
}

/// Reads the whole upload into memory, enforcing `max_bytes` on the file part.
pub async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Upload, AppError> {
    let mut upload = Upload::default();
    let mut has_file = false;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            upload.filename = field.file_name().unwrap_or("").to_string();
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| multipart_error(e, max_bytes))?
            {
                if bytes.len() + chunk.len() > max_bytes {
                    return Err(too_large(max_bytes));
                }
                bytes.extend_from_slice(&chunk);
            }
            upload.bytes = bytes;
            has_file = true;
        } else if !name.is_empty() {
            let text = field
                .text()
                .await
                .map_err(|e| multipart_error(e, max_bytes))?;
            upload.fields.insert(name, text);
        }
    }

    if !has_file {
        return Err(FileError::Missing.into());
    }
    tracing::debug!(
        "Received upload '{}' ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );
    Ok(upload)
}
