//! Task catalog files — TOML parsing and validation for `import-tasks`.
//!
//! A catalog file is a list of `[[task]]` tables:
//!
//! ```toml
//! [[task]]
//! kind = "audio_transcription"
//! category = "Transcription"
//! title = "Transcribe a short clip"
//! prompt = "Type exactly what the speaker says."
//! media_url = "https://cdn.example.com/clips/001.mp3"
//! reference_answer = "Good morning, how are you?"
//! reward = 15
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default, rename = "task")]
    pub tasks: Vec<NewTask>,
}

/// A task definition as it appears in a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub kind: String,
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    pub media_url: Option<String>,
    pub reference_answer: Option<String>,
    pub reward: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Parse and validate a catalog from a TOML string.
pub fn parse_toml(content: &str) -> Result<CatalogFile> {
    let file: CatalogFile = toml::from_str(content)?;
    validate(&file)?;
    Ok(file)
}

/// Parse and validate a catalog from a TOML file path.
pub fn parse_toml_file(path: &std::path::Path) -> Result<CatalogFile> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
    parse_toml(&content)
}

fn validate(file: &CatalogFile) -> Result<()> {
    if file.tasks.is_empty() {
        anyhow::bail!("catalog contains no [[task]] entries");
    }
    for (i, task) in file.tasks.iter().enumerate() {
        if task.kind.trim().is_empty() {
            anyhow::bail!("task #{}: kind is required", i + 1);
        }
        if task.category.trim().is_empty() {
            anyhow::bail!("task #{}: category is required", i + 1);
        }
        if task.title.trim().is_empty() {
            anyhow::bail!("task #{}: title is required", i + 1);
        }
        if task.reward <= 0 {
            anyhow::bail!(
                "task #{} ({}): reward must be positive, got {}",
                i + 1,
                task.title,
                task.reward
            );
        }
        if let Some(reference) = &task.reference_answer {
            if reference.trim().chars().count() < crate::answer::MIN_ANSWER_CHARS {
                anyhow::bail!(
                    "task #{} ({}): reference_answer is shorter than the minimum answer length",
                    i + 1,
                    task.title
                );
            }
        }
    }
    Ok(())
}
