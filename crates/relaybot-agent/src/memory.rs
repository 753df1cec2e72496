//! Memory — file-based long-term memory and daily notes.
//!
//! - **Long-term memory**: `workspace/memory/MEMORY.md`
//! - **Daily notes**: `workspace/memory/YYYY-MM-DD.md`
//!
//! The context builder reads memory on every prompt build; the agent
//! writes it through the filesystem tools.

use std::path::{Path, PathBuf};

use chrono::Utc;

/// File-based memory store for the agent.
pub struct MemoryStore {
    memory_dir: PathBuf,
    memory_file: PathBuf,
}

impl MemoryStore {
    /// Create a store without touching the filesystem; directories appear
    /// when the agent first writes.
    pub fn new(workspace: &Path) -> Self {
        let memory_dir = workspace.join("memory");
        let memory_file = memory_dir.join("MEMORY.md");
        Self {
            memory_dir,
            memory_file,
        }
    }

    /// Path to the long-term memory file.
    pub fn memory_file(&self) -> &Path {
        &self.memory_file
    }

    /// Read the long-term memory file. Empty string if absent.
    pub fn read_long_term(&self) -> String {
        std::fs::read_to_string(&self.memory_file).unwrap_or_default()
    }

    /// Path to today's daily notes file.
    pub fn today_file(&self) -> PathBuf {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        self.memory_dir.join(format!("{today}.md"))
    }

    /// Read today's daily notes. Empty string if absent.
    pub fn read_today(&self) -> String {
        std::fs::read_to_string(self.today_file()).unwrap_or_default()
    }

    /// Build the memory block for the system prompt, or `None` when there
    /// is nothing to inject.
    pub fn get_memory_context(&self) -> Option<String> {
        let long_term = self.read_long_term();
        let today = self.read_today();

        if long_term.is_empty() && today.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if !long_term.is_empty() {
            parts.push(format!("## Long-term Memory\n\n{long_term}"));
        }
        if !today.is_empty() {
            parts.push(format!("## Today's Notes\n\n{today}"));
        }
        Some(parts.join("\n\n"))
    }
}
