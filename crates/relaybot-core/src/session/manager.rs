//! Session persistence and caching.
//!
//! File format: JSONL in `~/.relaybot/sessions/{safe_key}.jsonl`
//! - Line 1: `{"_type":"metadata","created_at":"...","updated_at":"...","metadata":{}}`
//! - Line 2+: one message object per line, in order
//!
//! Saves go through a temp-file + rename so a crash mid-write cannot
//! corrupt the transcript. The agent loop is the single writer per session
//! key, so no file locking is needed.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{Message, Session};
use crate::utils;

// ─────────────────────────────────────────────
// Session metadata (first line of JSONL)
// ─────────────────────────────────────────────

/// Metadata header written as the first line of each JSONL session file.
#[derive(Debug, Serialize, Deserialize)]
struct SessionMetadata {
    #[serde(rename = "_type")]
    record_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

// ─────────────────────────────────────────────
// SessionManager
// ─────────────────────────────────────────────

/// Manages conversation sessions with in-memory caching and JSONL persistence.
///
/// Thread-safe via `RwLock` — multiple readers, exclusive writer.
pub struct SessionManager {
    /// Directory where `.jsonl` session files are stored.
    sessions_dir: PathBuf,
    /// In-memory cache of active sessions.
    cache: RwLock<HashMap<String, Session>>,
}

impl SessionManager {
    /// Create a new session manager.
    ///
    /// `sessions_dir` defaults to `~/.relaybot/sessions/` if `None`.
    /// The directory is created if it doesn't exist.
    pub fn new(sessions_dir: Option<PathBuf>) -> std::io::Result<Self> {
        let dir = sessions_dir.unwrap_or_else(utils::get_sessions_path);
        std::fs::create_dir_all(&dir)?;

        Ok(SessionManager {
            sessions_dir: dir,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Get an existing session or create a new one. Idempotent.
    ///
    /// 1. Check in-memory cache
    /// 2. Try to load from disk
    /// 3. Create new empty session
    pub fn get_or_create(&self, key: &str) -> Session {
        {
            let cache = self.cache.read().unwrap();
            if let Some(session) = cache.get(key) {
                return session.clone();
            }
        }

        if let Some(session) = self.load_from_disk(key) {
            let mut cache = self.cache.write().unwrap();
            cache.insert(key.to_string(), session.clone());
            return session;
        }

        let session = Session::new(key);
        let mut cache = self.cache.write().unwrap();
        cache.insert(key.to_string(), session.clone());
        session
    }

    /// Append a message to a session and flush to disk.
    pub fn add_message(&self, key: &str, message: Message) {
        let mut session = self.get_or_create(key);
        session.messages.push(message);
        session.updated_at = Utc::now();

        {
            let mut cache = self.cache.write().unwrap();
            cache.insert(key.to_string(), session.clone());
        }

        if let Err(e) = self.save_to_disk(&session) {
            warn!("Failed to persist session {}: {}", key, e);
        }
    }

    /// Get the last `max_messages` from a session's history, in order.
    pub fn get_history(&self, key: &str, max_messages: usize) -> Vec<Message> {
        let session = self.get_or_create(key);
        let len = session.messages.len();
        if len <= max_messages {
            session.messages
        } else {
            session.messages[len - max_messages..].to_vec()
        }
    }

    /// Clear all messages in a session (reset conversation).
    pub fn clear(&self, key: &str) {
        let mut session = self.get_or_create(key);
        session.messages.clear();
        session.updated_at = Utc::now();

        {
            let mut cache = self.cache.write().unwrap();
            cache.insert(key.to_string(), session.clone());
        }

        if let Err(e) = self.save_to_disk(&session) {
            warn!("Failed to persist cleared session {}: {}", key, e);
        }
    }

    /// List all sessions from disk, sorted by `updated_at` (newest first).
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries = Vec::new();

        let entries = match std::fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read sessions directory: {}", e);
                return summaries;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "jsonl") {
                continue;
            }

            if let Ok(file) = std::fs::File::open(&path) {
                let reader = std::io::BufReader::new(file);
                if let Some(Ok(line)) = reader.lines().next() {
                    if let Ok(meta) = serde_json::from_str::<SessionMetadata>(&line) {
                        let key = path
                            .file_stem()
                            .and_then(|s| s.to_str())
                            .map(|s| s.replace('_', ":"))
                            .unwrap_or_default();

                        summaries.push(SessionSummary {
                            key,
                            created_at: meta.created_at,
                            updated_at: meta.updated_at,
                            path: path.clone(),
                        });
                    }
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    /// Get the JSONL file path for a session key.
    fn session_path(&self, key: &str) -> PathBuf {
        let safe_key = utils::safe_filename(&key.replace(':', "_"));
        self.sessions_dir.join(format!("{}.jsonl", safe_key))
    }

    /// Load a session from a JSONL file.
    fn load_from_disk(&self, key: &str) -> Option<Session> {
        let path = self.session_path(key);
        if !path.exists() {
            return None;
        }

        let file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Failed to open session file {}: {}", path.display(), e);
                return None;
            }
        };

        let reader = std::io::BufReader::new(file);
        let mut session = Session::new(key);
        let mut messages = Vec::new();

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => continue,
            };

            if line.trim().is_empty() {
                continue;
            }

            // Metadata header first
            if let Ok(meta) = serde_json::from_str::<SessionMetadata>(&line) {
                if meta.record_type == "metadata" {
                    session.created_at = meta.created_at;
                    session.updated_at = meta.updated_at;
                    session.metadata = meta.metadata;
                    continue;
                }
            }

            if let Ok(msg) = serde_json::from_str::<Message>(&line) {
                messages.push(msg);
            }
        }

        session.messages = messages;
        debug!(
            "Loaded session '{}' with {} messages from disk",
            key,
            session.messages.len()
        );
        Some(session)
    }

    /// Save a session to its JSONL file via temp-file + rename.
    fn save_to_disk(&self, session: &Session) -> std::io::Result<()> {
        let path = self.session_path(&session.key);

        let meta = SessionMetadata {
            record_type: "metadata".to_string(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            metadata: session.metadata.clone(),
        };

        let mut buf = String::new();
        buf.push_str(&serde_json::to_string(&meta)?);
        buf.push('\n');
        for msg in &session.messages {
            buf.push_str(&serde_json::to_string(msg)?);
            buf.push('\n');
        }

        utils::atomic_write(&path, &buf)?;

        debug!(
            "Saved session '{}' ({} messages) to {}",
            session.key,
            session.messages.len(),
            path.display()
        );
        Ok(())
    }
}

/// Summary of a session for listing purposes.
#[derive(Clone, Debug)]
pub struct SessionSummary {
    /// Session key (e.g. `"telegram:12345"`).
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Path to the JSONL file.
    pub path: PathBuf,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
