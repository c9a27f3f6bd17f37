use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory before falling back to
/// `~/.silibot/config.toml`.
pub const LOCAL_CONFIG_FILE: &str = "silibot.toml";

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to the config file - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Directory relative store paths resolve against - computed, not serialized
    #[serde(skip)]
    pub working_dir: PathBuf,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub reboot: RebootConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default)]
    pub provider: ProviderConfig,
}

// ── Bot identity & authority ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Display name used in replies ("SILI is restarting...")
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// User ids allowed to restart the bot; nobody may while empty
    #[serde(default)]
    pub operators: Vec<String>,
    /// User ids allowed to run history commands (operators always are)
    #[serde(default)]
    pub trusted: Vec<String>,
}

fn default_bot_name() -> String {
    "SILI".into()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            operators: Vec::new(),
            trusted: Vec::new(),
        }
    }
}

// ── Signal store ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "file" | "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Directory holding the key files; relative paths resolve against the
    /// process working directory.
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
    /// Prefix prepended to every key file name
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_store_backend() -> String {
    "file".into()
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_prefix() -> String {
    crate::signal::file::DEFAULT_FILE_PREFIX.into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            dir: default_store_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}

// ── Conversation history ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum messages kept per channel (oldest evicted first)
    #[serde(default = "default_records_per_channel")]
    pub records_per_channel: usize,
    /// Message bodies longer than this are truncated when recorded
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_records_per_channel() -> usize {
    100
}

fn default_max_content_chars() -> usize {
    2000
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            records_per_channel: default_records_per_channel(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

// ── Restart ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebootConfig {
    /// How long the requester has to confirm
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
    /// Replies accepted as "yes"
    #[serde(default = "default_confirm_tokens")]
    pub confirm_tokens: Vec<String>,
}

fn default_confirm_timeout_secs() -> u64 {
    10
}

fn default_confirm_tokens() -> Vec<String> {
    vec![".".into(), "。".into()]
}

impl Default for RebootConfig {
    fn default() -> Self {
        Self {
            confirm_timeout_secs: default_confirm_timeout_secs(),
            confirm_tokens: default_confirm_tokens(),
        }
    }
}

// ── Diagnostics ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Lines kept before the oldest are dropped; 0 keeps everything
    #[serde(default = "default_diagnostics_max_lines")]
    pub max_lines: usize,
    /// Least severe log level copied into the startup report
    /// ("error" | "warn" | "info" | "debug" | "trace")
    #[serde(default = "default_capture_level")]
    pub capture_level: String,
}

fn default_diagnostics_max_lines() -> usize {
    500
}

fn default_capture_level() -> String {
    "info".into()
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_lines: default_diagnostics_max_lines(),
            capture_level: default_capture_level(),
        }
    }
}

// ── Chat summary ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Refuse to summarize channels with fewer buffered messages
    #[serde(default = "default_summary_min_records")]
    pub min_records: usize,
    #[serde(default = "default_summary_model")]
    pub model: String,
    #[serde(default = "default_summary_temperature")]
    pub temperature: f64,
    /// System prompt sent ahead of the formatted records
    #[serde(default = "default_summary_prompt")]
    pub prompt: String,
}

fn default_summary_min_records() -> usize {
    10
}

fn default_summary_model() -> String {
    "gpt-3.5-turbo".into()
}

fn default_summary_temperature() -> f64 {
    0.7
}

fn default_summary_prompt() -> String {
    "You will receive a JSON array of chat messages, each with a `user` and a `msg`. \
     Summarize what the group talked about in a few short paragraphs, naming the main \
     participants of each topic. Answer in the language most of the messages use."
        .into()
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            min_records: default_summary_min_records(),
            model: default_summary_model(),
            temperature: default_summary_temperature(),
            prompt: default_summary_prompt(),
        }
    }
}

// ── Completion provider ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// "openai" | "none"
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Custom OpenAI-compatible endpoint (defaults to api.openai.com)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".into()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_provider_timeout_secs() -> u64 {
    90
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

// ── Loading & saving ─────────────────────────────────────────────

impl Config {
    /// Resolve the config file (explicit path, `./silibot.toml`, then
    /// `~/.silibot/config.toml`), load it or write defaults, and apply
    /// environment overrides.
    pub fn load_or_init(explicit: Option<&Path>) -> Result<Self> {
        let working_dir =
            std::env::current_dir().context("Could not determine working directory")?;
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let local = working_dir.join(LOCAL_CONFIG_FILE);
                if local.exists() {
                    local
                } else {
                    let home = UserDirs::new()
                        .map(|u| u.home_dir().to_path_buf())
                        .context("Could not find home directory")?;
                    home.join(".silibot").join("config.toml")
                }
            }
        };

        let mut config = Self::load_or_init_at(&config_path)?;
        config.working_dir = working_dir;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load `config_path`, creating it with defaults when it does not exist.
    /// Does not apply environment overrides.
    pub fn load_or_init_at(config_path: &Path) -> Result<Self> {
        let working_dir = config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), PathBuf::from);

        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
            let mut config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
            config.config_path = config_path.to_path_buf();
            config.working_dir = working_dir;
            config.validate()?;
            Ok(config)
        } else {
            let mut config = Config::default();
            config.config_path = config_path.to_path_buf();
            config.working_dir = working_dir;
            config.save()?;
            tracing::info!(path = %config_path.display(), "Wrote default config");
            Ok(config)
        }
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("SILIBOT_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY")) {
            if !key.is_empty() {
                self.provider.api_key = Some(key);
            }
        }

        if let Ok(url) = std::env::var("SILIBOT_BASE_URL") {
            if !url.is_empty() {
                self.provider.base_url = Some(url);
            }
        }

        if let Ok(raw) = std::env::var("SILIBOT_OPERATORS") {
            let operators = split_list(&raw);
            if !operators.is_empty() {
                self.bot.operators = operators;
            }
        }

        if let Ok(dir) = std::env::var("SILIBOT_STORE_DIR") {
            if !dir.is_empty() {
                self.store.dir = PathBuf::from(dir);
            }
        }

        if let Ok(raw) = std::env::var("SILIBOT_RECORDS_PER_CHANNEL") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.history.records_per_channel = n,
                _ => tracing::warn!(value = %raw, "Ignoring invalid SILIBOT_RECORDS_PER_CHANNEL"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.history.records_per_channel == 0 {
            anyhow::bail!("history.records_per_channel must be at least 1");
        }
        if self.reboot.confirm_timeout_secs == 0 {
            anyhow::bail!("reboot.confirm_timeout_secs must be at least 1");
        }
        if self.reboot.confirm_tokens.iter().all(|t| t.trim().is_empty()) {
            anyhow::bail!("reboot.confirm_tokens must contain at least one non-empty token");
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;
        fs::create_dir_all(parent_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("config.toml");
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));

        let mut temp_file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .with_context(|| {
                format!(
                    "Failed to create temporary config file: {}",
                    temp_path.display()
                )
            })?;
        temp_file
            .write_all(toml_str.as_bytes())
            .context("Failed to write temporary config contents")?;
        temp_file
            .sync_all()
            .context("Failed to fsync temporary config file")?;
        drop(temp_file);

        if let Err(e) = fs::rename(&temp_path, &self.config_path) {
            let _ = fs::remove_file(&temp_path);
            anyhow::bail!("Failed to atomically replace config file: {e}");
        }

        sync_directory(parent_dir)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(unix)]
fn sync_directory(path: &Path) -> Result<()> {
    let dir = File::open(path)
        .with_context(|| format!("Failed to open directory for fsync: {}", path.display()))?;
    dir.sync_all()
        .with_context(|| format!("Failed to fsync directory metadata: {}", path.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── Defaults ─────────────────────────────────────────────

    #[test]
    fn config_default_has_sane_values() {
        let c = Config::default();
        assert_eq!(c.bot.name, "SILI");
        assert!(c.bot.operators.is_empty());
        assert_eq!(c.store.backend, "file");
        assert_eq!(c.store.dir, PathBuf::from("."));
        assert_eq!(c.store.file_prefix, ".silibot_");
        assert_eq!(c.history.records_per_channel, 100);
        assert_eq!(c.reboot.confirm_timeout_secs, 10);
        assert_eq!(c.reboot.confirm_tokens, vec![".".to_string(), "。".to_string()]);
        assert_eq!(c.diagnostics.max_lines, 500);
        assert_eq!(c.summary.min_records, 10);
        assert_eq!(c.provider.max_tokens, 500);
        assert!(c.provider.api_key.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let raw = r#"
[bot]
operators = ["10001"]

[history]
records_per_channel = 50
"#;
        let c: Config = toml::from_str(raw).unwrap();
        assert_eq!(c.bot.operators, vec!["10001".to_string()]);
        assert_eq!(c.bot.name, "SILI");
        assert_eq!(c.history.records_per_channel, 50);
        assert_eq!(c.history.max_content_chars, 2000);
        assert_eq!(c.reboot.confirm_timeout_secs, 10);
    }

    // ── Load / save ──────────────────────────────────────────

    #[test]
    fn load_or_init_writes_defaults_when_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("silibot.toml");

        let c = Config::load_or_init_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(c.config_path, path);
        assert_eq!(c.working_dir, tmp.path().join("nested"));

        let reloaded = Config::load_or_init_at(&path).unwrap();
        assert_eq!(reloaded.history.records_per_channel, 100);
    }

    #[test]
    fn save_roundtrips_custom_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("silibot.toml");
        let mut c = Config::load_or_init_at(&path).unwrap();
        c.bot.operators = vec!["alice".into()];
        c.reboot.confirm_tokens = vec!["yes".into()];
        c.save().unwrap();

        let reloaded = Config::load_or_init_at(&path).unwrap();
        assert_eq!(reloaded.bot.operators, vec!["alice".to_string()]);
        assert_eq!(reloaded.reboot.confirm_tokens, vec!["yes".to_string()]);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("silibot.toml");
        fs::write(&path, "[history]\nrecords_per_channel = 0\n").unwrap();

        let err = Config::load_or_init_at(&path).unwrap_err();
        assert!(err.to_string().contains("records_per_channel"));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("silibot.toml");
        fs::write(&path, "[history\n").unwrap();

        let err = Config::load_or_init_at(&path).unwrap_err();
        assert!(format!("{err:#}").contains("silibot.toml"));
    }

    #[test]
    fn validate_requires_confirm_token() {
        let mut c = Config::default();
        c.reboot.confirm_tokens = vec!["  ".into()];
        assert!(c.validate().is_err());
    }

    #[test]
    fn split_list_ignores_blanks() {
        assert_eq!(
            split_list(" a, ,b ,"),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
