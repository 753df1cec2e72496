//! Skills loader — discovers and loads markdown skill files.
//!
//! Skills are `SKILL.md` files under `workspace/skills/<name>/` that teach
//! the agent how to combine existing tools for a domain. The system prompt
//! carries a summary catalogue; SSE clients can select skills by glob
//! (`skill_list`), in which case the matching skill bodies are injected in
//! full.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::patterns;

/// Metadata about a discovered skill.
#[derive(Clone, Debug)]
pub struct SkillInfo {
    /// Skill name (directory name).
    pub name: String,
    /// Path to the `SKILL.md` file.
    pub path: PathBuf,
}

/// Discovers and loads skill files from the workspace.
pub struct SkillsLoader {
    skills_dir: PathBuf,
}

impl SkillsLoader {
    /// Create a new skills loader rooted at `workspace/skills/`.
    pub fn new(workspace: &Path) -> Self {
        Self {
            skills_dir: workspace.join("skills"),
        }
    }

    /// Discover all skills, sorted by name.
    pub fn list_skills(&self) -> Vec<SkillInfo> {
        let mut skills = Vec::new();

        let entries = match std::fs::read_dir(&self.skills_dir) {
            Ok(e) => e,
            Err(_) => return skills,
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let skill_file = dir.join("SKILL.md");
            if !skill_file.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            debug!(skill = %name, "discovered skill");
            skills.push(SkillInfo {
                name,
                path: skill_file,
            });
        }

        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    /// Names of all discovered skills.
    pub fn skill_names(&self) -> Vec<String> {
        self.list_skills().into_iter().map(|s| s.name).collect()
    }

    /// Build the summary catalogue injected into every system prompt.
    pub fn build_skills_summary(&self) -> String {
        let skills = self.list_skills();
        if skills.is_empty() {
            return String::new();
        }

        let mut lines = vec!["<skills>".to_string()];
        for skill in &skills {
            lines.push(format!(
                "  <skill name=\"{}\" path=\"{}\" />",
                skill.name,
                skill.path.display()
            ));
        }
        lines.push("</skills>".to_string());
        lines.join("\n")
    }

    /// Load the full bodies of the skills selected by glob patterns.
    ///
    /// An all-selecting pattern list loads nothing here — the summary
    /// catalogue already covers the default case, and the agent reads
    /// individual `SKILL.md` files on demand.
    pub fn load_selected(&self, skill_list: &[String]) -> String {
        if patterns::selects_all(skill_list) {
            return String::new();
        }

        let skills = self.list_skills();
        let names: Vec<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        let selected = patterns::filter_names(skill_list, names);

        let mut parts = Vec::new();
        for skill in &skills {
            if !selected.contains(&skill.name) {
                continue;
            }
            if let Ok(content) = std::fs::read_to_string(&skill.path) {
                parts.push(format!("## Skill: {}\n\n{}", skill.name, content));
            }
        }
        parts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(workspace: &Path, name: &str, body: &str) {
        let dir = workspace.join("skills").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SKILL.md"), body).unwrap();
    }

    #[test]
    fn test_no_skills_dir() {
        let dir = tempfile::tempdir().unwrap();
        let loader = SkillsLoader::new(dir.path());
        assert!(loader.list_skills().is_empty());
        assert!(loader.build_skills_summary().is_empty());
    }

    #[test]
    fn test_discover_skills_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "github", "# GitHub");
        write_skill(dir.path(), "calendar", "# Calendar");

        let loader = SkillsLoader::new(dir.path());
        assert_eq!(loader.skill_names(), vec!["calendar", "github"]);
    }

    #[test]
    fn test_skills_summary_format() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "github", "# GitHub");

        let loader = SkillsLoader::new(dir.path());
        let summary = loader.build_skills_summary();
        assert!(summary.starts_with("<skills>"));
        assert!(summary.contains("name=\"github\""));
        assert!(summary.ends_with("</skills>"));
    }

    #[test]
    fn test_load_selected_by_glob() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "github", "Use the gh CLI.");
        write_skill(dir.path(), "gitlab", "Use glab.");
        write_skill(dir.path(), "weather", "Use wttr.in.");

        let loader = SkillsLoader::new(dir.path());
        let loaded = loader.load_selected(&["git*".to_string()]);
        assert!(loaded.contains("Use the gh CLI."));
        assert!(loaded.contains("Use glab."));
        assert!(!loaded.contains("wttr.in"));
    }

    #[test]
    fn test_load_selected_star_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "github", "body");

        let loader = SkillsLoader::new(dir.path());
        assert!(loader.load_selected(&["*".to_string()]).is_empty());
        assert!(loader.load_selected(&[]).is_empty());
    }

    #[test]
    fn test_directory_without_skill_md_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("skills").join("empty")).unwrap();
        write_skill(dir.path(), "real", "body");

        let loader = SkillsLoader::new(dir.path());
        assert_eq!(loader.skill_names(), vec!["real"]);
    }
}
