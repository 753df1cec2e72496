//! Object-store tools — upload files and text to an S3-style HTTP endpoint.
//!
//! `StorageService` PUTs objects at `{endpoint}/{bucket}/{object_key}` with
//! optional bearer auth and returns a public URL. Object keys follow
//! `session_id/request_id/message_id/filename`, with the identity injected
//! by the agent loop per request (`set_request_scope`).
//!
//! Both tools carry a progress channel: a `step` event when the upload
//! starts and a media event with the public URL when it lands.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error};

use relaybot_core::config::schema::StorageConfig;

use super::base::{optional_string, require_string, MediaKind, ProgressEvent, ProgressSlot, Tool};

// ─────────────────────────────────────────────
// StorageService
// ─────────────────────────────────────────────

/// Thin HTTP client for an S3-style object store.
pub struct StorageService {
    config: StorageConfig,
    client: reqwest::Client,
}

impl StorageService {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Whether the service has a usable configuration.
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    /// The PUT target for an object key.
    fn object_url(&self, object_key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            object_key
        )
    }

    /// The public URL returned to callers.
    pub fn public_url(&self, object_key: &str) -> String {
        let base = if self.config.public_base_url.is_empty() {
            &self.config.endpoint
        } else {
            &self.config.public_base_url
        };
        format!("{}/{}/{}", base.trim_end_matches('/'), self.config.bucket, object_key)
    }

    /// Upload raw bytes under an object key. Returns the public URL.
    pub async fn put_bytes(
        &self,
        object_key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> anyhow::Result<String> {
        if !self.is_enabled() {
            anyhow::bail!("storage service is not configured");
        }

        let url = self.object_url(object_key);
        debug!(url = %url, bytes = bytes.len(), "uploading object");

        let mut req = self
            .client
            .put(&url)
            .header("Content-Type", content_type)
            .body(bytes);
        if !self.config.access_token.is_empty() {
            req = req.bearer_auth(&self.config.access_token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Upload request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(status = %status, "object upload rejected");
            anyhow::bail!("Upload failed with {status}: {body}");
        }

        Ok(self.public_url(object_key))
    }

    /// Upload text content under an object key. Returns the public URL.
    pub async fn put_text(
        &self,
        object_key: &str,
        text: &str,
        content_type: &str,
    ) -> anyhow::Result<String> {
        self.put_bytes(object_key, text.as_bytes().to_vec(), content_type)
            .await
    }
}

/// Guess a content type from a filename extension.
pub fn guess_content_type(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    let ext = lower.rsplit('.').next().unwrap_or("");
    match ext {
        "html" | "htm" => "text/html; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "xml" => "application/xml; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "yaml" | "yml" => "application/yaml; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Media kind of an uploaded file, by extension.
fn media_kind(filename: &str) -> MediaKind {
    let lower = filename.to_lowercase();
    let ext = lower.rsplit('.').next().unwrap_or("");
    match ext {
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" => MediaKind::Image,
        "mp4" | "webm" | "mov" | "avi" => MediaKind::Video,
        _ => MediaKind::File,
    }
}

// ─────────────────────────────────────────────
// Request scope
// ─────────────────────────────────────────────

#[derive(Clone, Debug)]
struct RequestScope {
    session_id: String,
    request_id: String,
    message_id: String,
}

/// Build the object key for a filename under an optional request scope.
fn build_object_key(scope: Option<&RequestScope>, filename: &str) -> String {
    let safe = relaybot_core::utils::safe_filename(filename);
    match scope {
        Some(s) => format!(
            "{}/{}/{}/{}",
            s.session_id, s.request_id, s.message_id, safe
        ),
        None => format!("uploads/{safe}"),
    }
}

// ─────────────────────────────────────────────
// StoragePutFileTool
// ─────────────────────────────────────────────

/// Uploads a local file to the object store.
pub struct StoragePutFileTool {
    service: Arc<StorageService>,
    scope: Mutex<Option<RequestScope>>,
    progress: ProgressSlot,
}

impl StoragePutFileTool {
    pub fn new(service: Arc<StorageService>) -> Self {
        Self {
            service,
            scope: Mutex::new(None),
            progress: ProgressSlot::new(),
        }
    }
}

#[async_trait]
impl Tool for StoragePutFileTool {
    fn name(&self) -> &str {
        "storage_put_file"
    }

    fn description(&self) -> &str {
        "Upload a local file to the object store. Returns the public URL of the \
         uploaded file."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The local file path to upload"
                },
                "filename": {
                    "type": "string",
                    "description": "Target filename (defaults to the original name)"
                }
            },
            "required": ["file_path"]
        })
    }

    fn set_request_scope(&self, session_id: &str, request_id: &str, message_id: &str) {
        *self.scope.lock().unwrap() = Some(RequestScope {
            session_id: session_id.to_string(),
            request_id: request_id.to_string(),
            message_id: message_id.to_string(),
        });
    }

    fn progress_slot(&self) -> Option<&ProgressSlot> {
        Some(&self.progress)
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        if !self.service.is_enabled() {
            return Ok("Error: Object storage is not configured. Set storage.endpoint in config.json.".into());
        }

        let file_path = require_string(&params, "file_path")?;
        let local_path = relaybot_core::utils::expand_home(&file_path);
        if !local_path.is_file() {
            anyhow::bail!("File not found: {file_path}");
        }

        let filename = optional_string(&params, "filename").unwrap_or_else(|| {
            Path::new(&file_path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "upload.bin".to_string())
        });

        let scope = self.scope.lock().unwrap().clone();
        let object_key = build_object_key(scope.as_ref(), &filename);

        self.progress.send(ProgressEvent::Step {
            text: format!("Uploading {filename}"),
        });

        let bytes = tokio::fs::read(&local_path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", local_path.display()))?;
        let content_type = guess_content_type(&filename);

        let url = self.service.put_bytes(&object_key, bytes, content_type).await?;

        self.progress.send(ProgressEvent::Media {
            kind: media_kind(&filename),
            url: url.clone(),
            name: Some(filename),
        });

        Ok(format!("File uploaded.\nURL: {url}\nObject key: {object_key}"))
    }
}

// ─────────────────────────────────────────────
// StoragePutTextTool
// ─────────────────────────────────────────────

/// Uploads text content (HTML, JSON, Markdown, …) to the object store.
pub struct StoragePutTextTool {
    service: Arc<StorageService>,
    scope: Mutex<Option<RequestScope>>,
    progress: ProgressSlot,
}

impl StoragePutTextTool {
    pub fn new(service: Arc<StorageService>) -> Self {
        Self {
            service,
            scope: Mutex::new(None),
            progress: ProgressSlot::new(),
        }
    }
}

#[async_trait]
impl Tool for StoragePutTextTool {
    fn name(&self) -> &str {
        "storage_put_text"
    }

    fn description(&self) -> &str {
        "Upload text content to the object store. The content type is detected \
         from the filename extension (override with content_type). Returns the \
         public URL."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The text content to upload"
                },
                "filename": {
                    "type": "string",
                    "description": "Target filename with extension, e.g. 'report.html'"
                },
                "content_type": {
                    "type": "string",
                    "description": "Override the detected content type (optional)"
                }
            },
            "required": ["content", "filename"]
        })
    }

    fn set_request_scope(&self, session_id: &str, request_id: &str, message_id: &str) {
        *self.scope.lock().unwrap() = Some(RequestScope {
            session_id: session_id.to_string(),
            request_id: request_id.to_string(),
            message_id: message_id.to_string(),
        });
    }

    fn progress_slot(&self) -> Option<&ProgressSlot> {
        Some(&self.progress)
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        if !self.service.is_enabled() {
            return Ok("Error: Object storage is not configured. Set storage.endpoint in config.json.".into());
        }

        let content = require_string(&params, "content")?;
        let filename = require_string(&params, "filename")?;
        if content.is_empty() {
            anyhow::bail!("Content cannot be empty");
        }

        let content_type =
            optional_string(&params, "content_type").unwrap_or_else(|| guess_content_type(&filename).to_string());

        let scope = self.scope.lock().unwrap().clone();
        let object_key = build_object_key(scope.as_ref(), &filename);

        self.progress.send(ProgressEvent::Step {
            text: format!("Uploading {filename}"),
        });

        let url = self
            .service
            .put_text(&object_key, &content, &content_type)
            .await?;

        self.progress.send(ProgressEvent::Media {
            kind: media_kind(&filename),
            url: url.clone(),
            name: Some(filename),
        });

        Ok(format!(
            "Text uploaded.\nURL: {url}\nObject key: {object_key}\nContent-Type: {content_type}"
        ))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
