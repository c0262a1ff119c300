use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::{PipelineError, Result};

/// What the storage side reported for one uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub requested_path: String,
    /// Returned file metadata, as-is. Its path differs from `requested_path` after an autorename.
    pub metadata: Value,
}

impl UploadResult {
    pub fn stored_path(&self) -> &str {
        self.metadata
            .get("path_display")
            .and_then(Value::as_str)
            .unwrap_or(&self.requested_path)
    }

    pub fn size(&self) -> Option<u64> {
        self.metadata.get("size").and_then(Value::as_u64)
    }
}

impl fmt::Display for UploadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size() {
            Some(size) => write!(f, "{} ({} bytes)", self.stored_path(), size),
            None => write!(f, "{} {}", self.stored_path(), self.metadata),
        }
    }
}

#[async_trait]
pub trait StorageService {
    async fn upload(&self, bytes: Vec<u8>, path: &str, autorename: bool) -> Result<UploadResult>;
}

pub struct DropboxClient {
    client: Client,
    content_base_url: String,
    access_token: String,
}

#[derive(Debug, Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

impl DropboxClient {
    pub fn new(content_base_url: &str, access_token: String) -> Self {
        Self {
            client: Client::new(),
            content_base_url: content_base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }
}

#[async_trait]
impl StorageService for DropboxClient {
    async fn upload(&self, bytes: Vec<u8>, path: &str, autorename: bool) -> Result<UploadResult> {
        let arg = serde_json::to_string(&UploadArg {
            path,
            mode: "add",
            autorename,
            mute: false,
        })
        .map(|json| header_safe_json(&json))
        .map_err(|e| PipelineError::transport("files/upload", e))?;

        let size = bytes.len();
        let response = self
            .client
            .post(format!("{}/files/upload", self.content_base_url))
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", arg)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| PipelineError::transport("files/upload", e))?;

        let status = response.status();
        debug!("Dropbox upload of {} ({} bytes) returned {}", path, size, status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::transport(
                "files/upload",
                format!("HTTP {} - {}", status, body),
            ));
        }

        let metadata: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::transport("files/upload", e))?;

        Ok(UploadResult {
            requested_path: path.to_string(),
            metadata,
        })
    }
}

/// `Dropbox-API-Arg` must be plain ASCII: every char from 0x7F up becomes a `\uXXXX` escape,
/// as a surrogate pair outside the BMP.
fn header_safe_json(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c > '\x7e' {
            for unit in c.encode_utf16(&mut units).iter() {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        } else {
            escaped.push(c);
        }
    }
    escaped
}
