//! Context builder — constructs the system prompt and the message list
//! sent to the provider.
//!
//! The system prompt is assembled from identity, bootstrap files, memory,
//! and the skills catalogue; per-turn messages are history + the current
//! user message (with media parts when present).

use std::path::PathBuf;

use chrono::Utc;
use tracing::debug;

use relaybot_core::types::{ContentPart, ImageUrl, Message, ToolCall};

use crate::memory::MemoryStore;
use crate::skills::SkillsLoader;

/// Files injected into the system prompt when present in the workspace root.
const BOOTSTRAP_FILES: &[&str] = &["AGENTS.md", "SOUL.md", "USER.md", "TOOLS.md", "IDENTITY.md"];

/// Builds system prompts and conversation message lists for the agent loop.
pub struct ContextBuilder {
    workspace: PathBuf,
    agent_name: String,
    memory: MemoryStore,
    skills: SkillsLoader,
}

impl ContextBuilder {
    /// Create a new context builder.
    pub fn new(workspace: impl Into<PathBuf>, agent_name: impl Into<String>) -> Self {
        let workspace = workspace.into();
        let memory = MemoryStore::new(&workspace);
        let skills = SkillsLoader::new(&workspace);
        Self {
            workspace,
            agent_name: agent_name.into(),
            memory,
            skills,
        }
    }

    /// The memory store backing this context.
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// The skills loader backing this context.
    pub fn skills(&self) -> &SkillsLoader {
        &self.skills
    }

    // ────────────── System prompt ──────────────

    /// Build the full system prompt.
    ///
    /// `skill_list` selects skill bodies to inject in full; an
    /// all-selecting list relies on the summary catalogue instead.
    pub fn build_system_prompt(&self, skill_list: &[String]) -> String {
        let mut parts: Vec<String> = Vec::new();

        parts.push(self.build_identity());

        for filename in BOOTSTRAP_FILES {
            let path = self.workspace.join(filename);
            if path.is_file() {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    debug!(file = filename, "loaded bootstrap file");
                    parts.push(format!("## {filename}\n\n{content}"));
                }
            }
        }

        if let Some(memory) = self.memory.get_memory_context() {
            parts.push(memory);
        }

        let selected = self.skills.load_selected(skill_list);
        if !selected.is_empty() {
            parts.push(format!("# Active Skills\n\n{selected}"));
        }

        let skills_summary = self.skills.build_skills_summary();
        if !skills_summary.is_empty() {
            parts.push(format!(
                "# Skills\n\n\
                 The following skills extend your capabilities. \
                 To use a skill, read its SKILL.md file using the `read_file` tool.\n\n\
                 {skills_summary}"
            ));
        }

        parts.join("\n\n---\n\n")
    }

    /// Core identity block.
    fn build_identity(&self) -> String {
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        let workspace = self.workspace.display();
        let memory_file = self.memory.memory_file().display();

        format!(
            "# Identity\n\n\
             You are **{name}**, an AI assistant.\n\n\
             - **Date/time**: {now}\n\
             - **Runtime**: Rust on {os}/{arch}\n\
             - **Workspace**: `{workspace}`\n\n\
             You have access to tools. Use them when needed to answer questions, \
             read/write files, run commands, search the web, and more. \
             Always prefer using tools over guessing. Be concise and helpful.\n\n\
             ## Memory\n\n\
             When you learn something important about the user or the project, \
             persist it by writing to `{memory_file}` using the `write_file` or \
             `edit_file` tool.",
            name = self.agent_name,
        )
    }

    // ────────────── Message building ──────────────

    /// Build the full message list for an LLM call:
    /// system prompt, then session history, then the current user message.
    pub fn build_messages(
        &self,
        history: &[Message],
        user_text: &str,
        media: &[String],
        channel: &str,
        chat_id: &str,
        skill_list: &[String],
    ) -> Vec<Message> {
        let mut messages = Vec::new();

        let mut system = self.build_system_prompt(skill_list);
        system.push_str(&format!(
            "\n\n## Current Session\nChannel: {channel}\nChat ID: {chat_id}"
        ));
        messages.push(Message::system(system));

        messages.extend_from_slice(history);

        if media.is_empty() {
            messages.push(Message::user(user_text));
        } else {
            messages.push(build_multimodal_user_message(user_text, media));
        }

        messages
    }

    /// Append a tool result to the message list.
    pub fn add_tool_result(messages: &mut Vec<Message>, tool_call_id: &str, result: &str) {
        messages.push(Message::tool_result(tool_call_id, result));
    }

    /// Append an assistant message (with optional tool calls).
    pub fn add_assistant_message(
        messages: &mut Vec<Message>,
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    ) {
        if tool_calls.is_empty() {
            if let Some(text) = content {
                messages.push(Message::assistant(text));
            }
        } else {
            messages.push(Message::assistant_tool_calls(content, tool_calls));
        }
    }
}

// ─────────────────────────────────────────────
// Multimodal helpers
// ─────────────────────────────────────────────

/// Build a user message with image parts from media URIs.
///
/// Media arrives as absolute URLs or base64 data URIs and passes through
/// unchanged; audio URIs are skipped (transcription text is already in the
/// content).
fn build_multimodal_user_message(text: &str, media: &[String]) -> Message {
    let mut parts = Vec::new();

    for uri in media {
        if is_audio_uri(uri) {
            continue;
        }
        parts.push(ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: uri.clone(),
                detail: None,
            },
        });
    }

    parts.push(ContentPart::Text {
        text: text.to_string(),
    });

    Message::user_parts(parts)
}

/// Check if a URI points at audio content.
fn is_audio_uri(uri: &str) -> bool {
    let lower = uri.to_lowercase();
    if lower.starts_with("data:audio/") {
        return true;
    }
    const AUDIO_EXTS: &[&str] = &[
        ".ogg", ".oga", ".opus", ".mp3", ".m4a", ".wav", ".flac", ".aac",
    ];
    AUDIO_EXTS.iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[String] = &[];

    #[test]
    fn test_is_audio_uri() {
        assert!(is_audio_uri("https://example.com/voice.ogg"));
        assert!(is_audio_uri("data:audio/mpeg;base64,xyz"));
        assert!(!is_audio_uri("https://example.com/photo.png"));
        assert!(!is_audio_uri("data:image/png;base64,xyz"));
    }

    #[test]
    fn test_build_identity() {
        let ctx = ContextBuilder::new("/tmp/workspace", "TestBot");
        let identity = ctx.build_identity();
        assert!(identity.contains("TestBot"));
        assert!(identity.contains("/tmp/workspace"));
        assert!(identity.contains("Rust on"));
    }

    #[test]
    fn test_build_system_prompt_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ContextBuilder::new(dir.path(), "Relaybot");
        let prompt = ctx.build_system_prompt(ALL);
        assert!(prompt.contains("Relaybot"));
    }

    #[test]
    fn test_build_system_prompt_with_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AGENTS.md"), "# Agent config\nBe helpful.").unwrap();
        let ctx = ContextBuilder::new(dir.path(), "Relaybot");
        let prompt = ctx.build_system_prompt(ALL);
        assert!(prompt.contains("Be helpful."));
        assert!(prompt.contains("## AGENTS.md"));
    }

    #[test]
    fn test_build_system_prompt_with_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mem_dir = dir.path().join("memory");
        std::fs::create_dir(&mem_dir).unwrap();
        std::fs::write(mem_dir.join("MEMORY.md"), "User prefers dark mode.").unwrap();
        let ctx = ContextBuilder::new(dir.path(), "Relaybot");
        let prompt = ctx.build_system_prompt(ALL);
        assert!(prompt.contains("User prefers dark mode."));
        assert!(prompt.contains("Long-term Memory"));
    }

    #[test]
    fn test_build_system_prompt_with_selected_skill() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join("skills").join("github");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), "Use the gh CLI.").unwrap();

        let ctx = ContextBuilder::new(dir.path(), "Relaybot");
        let prompt = ctx.build_system_prompt(&["github".to_string()]);
        assert!(prompt.contains("# Active Skills"));
        assert!(prompt.contains("Use the gh CLI."));
    }

    #[test]
    fn test_build_messages_text_only() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ContextBuilder::new(dir.path(), "Relaybot");
        let history = vec![
            Message::user("previous question"),
            Message::assistant("previous answer"),
        ];
        let msgs = ctx.build_messages(&history, "new question", &[], "cli", "direct", ALL);
        // system + 2 history + 1 user = 4
        assert_eq!(msgs.len(), 4);
    }

    #[test]
    fn test_build_messages_with_session_info() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ContextBuilder::new(dir.path(), "Relaybot");
        let msgs = ctx.build_messages(&[], "hello", &[], "telegram", "chat_42", ALL);
        if let Message::System { content } = &msgs[0] {
            assert!(content.contains("Channel: telegram"));
            assert!(content.contains("Chat ID: chat_42"));
        } else {
            panic!("First message should be System");
        }
    }

    #[test]
    fn test_build_messages_with_media() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ContextBuilder::new(dir.path(), "Relaybot");
        let media = vec![
            "https://example.com/photo.png".to_string(),
            "https://example.com/voice.ogg".to_string(),
        ];
        let msgs = ctx.build_messages(&[], "what's this?", &media, "cli", "direct", ALL);

        match msgs.last().unwrap() {
            Message::User {
                content: relaybot_core::types::MessageContent::Parts(parts),
            } => {
                // Audio skipped: one image part + one text part
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[0], ContentPart::ImageUrl { .. }));
                assert!(matches!(parts[1], ContentPart::Text { .. }));
            }
            other => panic!("expected multipart user message, got {:?}", other),
        }
    }

    #[test]
    fn test_add_tool_result() {
        let mut msgs = vec![Message::user("test")];
        ContextBuilder::add_tool_result(&mut msgs, "call_1", "result data");
        assert_eq!(msgs.len(), 2);
    }

    #[test]
    fn test_add_assistant_message_text() {
        let mut msgs = Vec::new();
        ContextBuilder::add_assistant_message(&mut msgs, Some("hello".into()), vec![]);
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn test_add_assistant_message_tool_calls() {
        let mut msgs = Vec::new();
        let tc = ToolCall::new("id1", "read_file", r#"{"path":"foo"}"#);
        ContextBuilder::add_assistant_message(&mut msgs, None, vec![tc]);
        assert_eq!(msgs.len(), 1);
        match &msgs[0] {
            Message::Assistant { tool_calls, .. } => {
                assert_eq!(tool_calls.as_ref().unwrap().len(), 1);
            }
            other => panic!("expected assistant message, got {:?}", other),
        }
    }
}
