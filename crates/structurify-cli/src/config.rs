use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use structurify_llm::{DEFAULT_BASE_URL, DEFAULT_MODEL, LlmConfig};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "structurify.toml";
pub const API_KEY_VAR: &str = "STRUCTURIFY_API_KEY";
pub const MODEL_VAR: &str = "STRUCTURIFY_MODEL";

// ── Config types ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub llm: LlmSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmSection {
    /// OpenAI-compatible base URL; a trailing `/chat/completions` is tolerated.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub json_mode: Option<bool>,
}

/// Values that win over the file, in increasing priority: environment, then flags.
#[derive(Debug, Default)]
pub struct Overrides {
    pub env_api_key: Option<String>,
    pub env_model: Option<String>,
    pub cli_model: Option<String>,
}

impl Overrides {
    pub fn from_env(cli_model: Option<String>) -> Self {
        Self {
            env_api_key: std::env::var(API_KEY_VAR).ok(),
            env_model: std::env::var(MODEL_VAR).ok(),
            cli_model,
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────

/// Read the TOML file. A missing file is only an error when it was asked for
/// explicitly.
pub fn load_file(path: &Path, explicit: bool) -> Result<FileConfig> {
    if !path.exists() {
        if explicit {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        debug!("No config file at {}, using defaults", path.display());
        return Ok(FileConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml_edit::de::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Merge file values and overrides onto the client defaults.
pub fn resolve(file: FileConfig, overrides: Overrides) -> LlmConfig {
    let defaults = LlmConfig::default();
    let llm = file.llm;

    let base_url = llm
        .endpoint
        .map(|e| {
            e.trim_end_matches('/')
                .trim_end_matches("/chat/completions")
                .to_string()
        })
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let model = [overrides.cli_model, overrides.env_model, llm.model]
        .into_iter()
        .flatten()
        .find(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    LlmConfig {
        base_url,
        api_key: [overrides.env_api_key, llm.api_key]
            .into_iter()
            .flatten()
            .find(|k| !k.trim().is_empty()),
        model,
        temperature: llm.temperature.or(defaults.temperature),
        max_tokens: llm.max_tokens.or(defaults.max_tokens),
        json_mode: llm.json_mode.unwrap_or(defaults.json_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_default_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = load_file(&dir.path().join(DEFAULT_CONFIG_FILE), false).unwrap();
        let config = resolve(file, Overrides::default());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.api_key().is_none());
        assert!(config.json_mode);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(&dir.path().join("nope.toml"), true).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn file_values_are_applied() {
        let file = write_config(
            r#"
[llm]
endpoint = "http://localhost:1234/v1/chat/completions"
api_key = "gsk_file"
model = "local-model"
temperature = 0.0
json_mode = false
"#,
        );
        let config = resolve(load_file(file.path(), true).unwrap(), Overrides::default());
        assert_eq!(config.base_url, "http://localhost:1234/v1");
        assert_eq!(config.api_key(), Some("gsk_file"));
        assert_eq!(config.model, "local-model");
        assert_eq!(config.temperature, Some(0.0));
        assert_eq!(config.max_tokens, Some(4096));
        assert!(!config.json_mode);
    }

    #[test]
    fn environment_beats_file_and_flag_beats_both() {
        let file = write_config("[llm]\napi_key = \"from_file\"\nmodel = \"file-model\"\n");
        let parsed = || load_file(file.path(), true).unwrap();

        let config = resolve(
            parsed(),
            Overrides {
                env_api_key: Some("from_env".to_string()),
                env_model: Some("env-model".to_string()),
                cli_model: None,
            },
        );
        assert_eq!(config.api_key(), Some("from_env"));
        assert_eq!(config.model, "env-model");

        let config = resolve(
            parsed(),
            Overrides {
                env_model: Some("env-model".to_string()),
                cli_model: Some("flag-model".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(config.model, "flag-model");
        assert_eq!(config.api_key(), Some("from_file"));
    }

    #[test]
    fn blank_environment_key_does_not_hide_file_key() {
        let file = write_config("[llm]\napi_key = \"from_file\"\n");
        let config = resolve(
            load_file(file.path(), true).unwrap(),
            Overrides {
                env_api_key: Some("  ".to_string()),
                env_model: Some(String::new()),
                cli_model: None,
            },
        );
        assert_eq!(config.api_key(), Some("from_file"));
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_config("[llm]\napi-key = \"typo\"\n");
        let err = load_file(file.path(), true).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
