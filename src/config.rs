use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_FILE: &str = ".env";
const CSRF_TOKEN_VAR: &str = "CROWDTASK_CSRF_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub presenter: PresenterConfig,
    pub simulation: Option<SimulationConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub api_base: String,
    /// `project` on current servers, `app` on old ones.
    #[serde(default = "default_project_collection")]
    pub project_collection: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default)]
    pub server_side_filters: bool,
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,
    /// Unset means the transport default.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_project_collection() -> String {
    "project".to_string()
}
fn default_page_limit() -> u32 { 100 }
fn default_csrf_header() -> String {
    "X-CSRFToken".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PresenterConfig {
    /// Short name of the project to serve tasks from.
    pub project: String,
    #[serde(default)]
    pub use_batches: bool,
    #[serde(default = "default_success_display_ms")]
    pub success_display_ms: u64,
    #[serde(default = "default_answers")]
    pub answers: Vec<String>,
}

fn default_success_display_ms() -> u64 { 1000 }
fn default_answers() -> Vec<String> {
    vec!["Yes".to_string(), "No".to_string(), "I don't know".to_string()]
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            use_batches: false,
            success_display_ms: default_success_display_ms(),
            answers: default_answers(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    pub fixture: PathBuf,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .with_context(|| "Failed to parse config TOML")?;
        if config.presenter.project.trim().is_empty() {
            anyhow::bail!("presenter.project cannot be empty");
        }
        if config.presenter.answers.is_empty() {
            anyhow::bail!("presenter.answers must list at least one answer");
        }
        if config.presenter.answers.len() > 9 {
            anyhow::bail!("presenter.answers supports at most 9 answers (keys 1-9)");
        }
        Ok(config)
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        // Strip BOM if present (common on Windows-created files)
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for line in content.lines() {
            let line = line.trim().trim_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    /// Anti-forgery token from the environment. Absent or blank means writes
    /// go out without one.
    pub fn csrf_token() -> Option<String> {
        match std::env::var(CSRF_TOKEN_VAR) {
            Ok(token) => {
                let token = sanitize_key(&token);
                (!token.is_empty()).then_some(token)
            }
            Err(_) => None,
        }
    }
}

/// Strip carriage returns, BOM, and other invisible chars from a token value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses() {
        let config = Config::load(Path::new("config.toml")).unwrap();
        assert_eq!(config.server.project_collection, "project");
        assert_eq!(config.server.page_limit, 100);
        assert_eq!(config.server.csrf_header, "X-CSRFToken");
        assert_eq!(config.presenter.project, "flickrperson");
        assert_eq!(config.presenter.success_display_ms, 1000);
        assert_eq!(config.presenter.answers.len(), 3);
        assert!(config.simulation.is_some());
    }

    #[test]
    fn test_defaults_fill_in() {
        let config = Config::parse(
            r#"
            [server]
            api_base = "http://localhost:5000"

            [presenter]
            project = "FlickrPerson"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.project_collection, "project");
        assert!(config.server.request_timeout_ms.is_none());
        assert!(!config.server.server_side_filters);
        assert!(!config.presenter.use_batches);
        assert_eq!(config.presenter.answers, default_answers());
        assert!(config.simulation.is_none());
    }

    #[test]
    fn test_empty_project_rejected() {
        let err = Config::parse(
            r#"
            [server]
            api_base = "http://localhost:5000"

            [presenter]
            project = "  "
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("presenter.project"));
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("\u{feff}abc\r\n"), "abc");
    }
}
