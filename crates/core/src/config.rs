use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::{format_duration, parse_duration};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            tracing::warn!(key, value = %v, "invalid boolean, using default");
            default
        }
        None => default,
    }
}

/// Read a period. Zero is rejected like any other invalid value.
fn profiled_env_duration(profile: &str, key: &str, default: Duration) -> Duration {
    match profiled_env_opt(profile, key) {
        Some(raw) => parse_duration(&raw)
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| {
                tracing::warn!(key, value = %raw, "invalid duration, using default");
                default
            }),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub rules: RulesConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RULESHARD_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("RULESHARD_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            rules: RulesConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  rules:       base_dir={}, work_dir={}",
            self.rules.base_dir.display(),
            self.rules.work_dir().display()
        );
        tracing::info!(
            "  evaluation:  interval={}, reload_interval={}, watch={}",
            format_duration(self.rules.evaluation_interval),
            format_duration(self.rules.reload_interval),
            self.rules.watch
        );
        tracing::info!("  files:       {} input path(s)", self.rules.files.len());
    }

    /// Return the effective configuration as JSON (for `--once` dumps and status output).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "rules": {
                "base_dir": self.rules.base_dir,
                "work_dir": self.rules.work_dir(),
                "files": self.rules.files,
                "evaluation_interval": format_duration(self.rules.evaluation_interval),
                "reload_interval": format_duration(self.rules.reload_interval),
                "watch": self.rules.watch,
            },
        })
    }
}

// ── Rules ─────────────────────────────────────────────────────

/// Where rule files come from and how often they are reloaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Directory that relative rule file paths are resolved against.
    pub base_dir: PathBuf,
    /// Directory for per-strategy projection files. Defaults to `<base_dir>/.rule-shards`.
    pub work_dir: Option<PathBuf>,
    /// Rule files or directories to load.
    pub files: Vec<PathBuf>,
    /// Default evaluation interval handed to every engine.
    pub evaluation_interval: Duration,
    /// How often the rule files are re-read even without filesystem events.
    pub reload_interval: Duration,
    /// Reload on filesystem changes.
    pub watch: bool,
}

impl RulesConfig {
    fn from_env_profiled(p: &str) -> Self {
        let files = profiled_env_or(p, "RULES_FILES", "data/rules")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
        Self {
            base_dir: PathBuf::from(profiled_env_or(p, "RULES_BASE_DIR", ".")),
            work_dir: profiled_env_opt(p, "RULES_WORK_DIR").map(PathBuf::from),
            files,
            evaluation_interval: profiled_env_duration(p, "RULES_EVAL_INTERVAL", Duration::from_secs(60)),
            reload_interval: profiled_env_duration(p, "RULES_RELOAD_INTERVAL", Duration::from_secs(30)),
            watch: profiled_env_bool(p, "RULES_WATCH", true),
        }
    }

    /// Effective projection directory.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join(".rule-shards"))
    }
}
