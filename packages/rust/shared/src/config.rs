//! Application configuration for jobplanner.
//!
//! User config lives at `~/.jobplanner/jobplanner.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{JobPlannerError, Result};
use crate::types::{Perspective, PerspectiveFocus};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "jobplanner.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".jobplanner";

/// Seed used when neither the config file nor the CLI provides one.
pub const DEFAULT_SEED: u64 = 0x5EED;

// ---------------------------------------------------------------------------
// Config structs (matching jobplanner.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Chat-completions service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Rules for the local fallback scorer.
    #[serde(default)]
    pub fallback: FallbackRules,

    /// Analyst perspectives consulted for every candidate.
    #[serde(default = "default_perspectives")]
    pub perspectives: Vec<Perspective>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            llm: LlmConfig::default(),
            fallback: FallbackRules::default(),
            perspectives: default_perspectives(),
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// How many days ahead interview slots may be offered.
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: u32,

    /// Daily interview cap (overflow slots excepted).
    #[serde(default = "default_max_per_day")]
    pub max_interviews_per_day: usize,

    /// How many top-ranked candidates get scheduled.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Largest score spread still labelled "high" consensus.
    #[serde(default = "default_consensus_spread")]
    pub high_consensus_spread: f64,

    /// Bound on each external call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub perspective_timeout_secs: u64,

    /// Fixed seed for slot generation and fallback scores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            lookahead_days: default_lookahead_days(),
            max_interviews_per_day: default_max_per_day(),
            top_k: default_top_k(),
            high_consensus_spread: default_consensus_spread(),
            perspective_timeout_secs: default_timeout_secs(),
            seed: None,
        }
    }
}

fn default_lookahead_days() -> u32 {
    14
}
fn default_max_per_day() -> usize {
    2
}
fn default_top_k() -> usize {
    5
}
fn default_consensus_spread() -> f64 {
    10.0
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used by perspectives that do not pin their own.
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}

/// `[fallback]` section: heuristics used when an analyst cannot be consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRules {
    /// Lower bound of the base score draw (inclusive).
    #[serde(default = "default_min_score")]
    pub min_score: u32,

    /// Upper bound of the base score draw (inclusive).
    #[serde(default = "default_max_score")]
    pub max_score: u32,

    /// Bonus for technical perspectives when skills hit the vocabulary.
    #[serde(default = "default_tech_bonus")]
    pub tech_bonus: u32,

    /// Bonus for recruiter perspectives when the label is a top employer.
    #[serde(default = "default_employer_bonus")]
    pub employer_bonus: u32,

    /// Technologies the technical perspective rewards (case-insensitive).
    #[serde(default = "default_tech_vocabulary")]
    pub tech_vocabulary: Vec<String>,

    /// Employers the recruiter perspective rewards (exact match, case-insensitive).
    #[serde(default = "default_top_employers")]
    pub top_employers: Vec<String>,
}

impl Default for FallbackRules {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            max_score: default_max_score(),
            tech_bonus: default_tech_bonus(),
            employer_bonus: default_employer_bonus(),
            tech_vocabulary: default_tech_vocabulary(),
            top_employers: default_top_employers(),
        }
    }
}

fn default_min_score() -> u32 {
    60
}
fn default_max_score() -> u32 {
    95
}
fn default_tech_bonus() -> u32 {
    5
}
fn default_employer_bonus() -> u32 {
    8
}
fn default_tech_vocabulary() -> Vec<String> {
    ["Python", "Java", "React", "Vue"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_top_employers() -> Vec<String> {
    ["Alibaba", "Tencent", "ByteDance", "阿里巴巴", "腾讯", "字节跳动"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// The three analysts the planner consults out of the box.
pub fn default_perspectives() -> Vec<Perspective> {
    vec![
        Perspective {
            id: "technical".into(),
            display_name: "Technical Expert".into(),
            focus_description: "skill match and technical growth prospects".into(),
            weight: 1.2,
            focus: PerspectiveFocus::Technical,
            model: None,
        },
        Perspective {
            id: "recruiter".into(),
            display_name: "HR Recruiter".into(),
            focus_description: "company reputation, culture fit and working environment".into(),
            weight: 1.0,
            focus: PerspectiveFocus::Recruiter,
            model: None,
        },
        Perspective {
            id: "career".into(),
            display_name: "Career Planner".into(),
            focus_description: "career path, compensation and room to grow".into(),
            weight: 1.1,
            focus: PerspectiveFocus::Career,
            model: None,
        },
    ]
}

impl AppConfig {
    /// Check values that serde defaults cannot guarantee.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.llm.api_base).map_err(|e| {
            JobPlannerError::config(format!("invalid llm.api_base '{}': {e}", self.llm.api_base))
        })?;
        PipelineConfig::from(self).validate()
    }
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Analysts consulted, in display order.
    pub perspectives: Vec<Perspective>,
    /// Slot window length in days, starting tomorrow.
    pub lookahead_days: u32,
    /// Default daily cap; [`Preferences`] may override it.
    pub max_per_day: usize,
    /// Default number of candidates to schedule; [`Preferences`] may override it.
    pub top_k: usize,
    /// Largest spread labelled "high" consensus.
    pub high_consensus_spread: f64,
    /// Bound on each external call.
    pub perspective_timeout: Duration,
    /// Seed for slots and fallback scores.
    pub seed: u64,
    /// Fallback heuristics.
    pub fallback: FallbackRules,
    /// "Today" for this run; slots start the day after.
    pub anchor_date: NaiveDate,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            perspectives: config.perspectives.clone(),
            lookahead_days: config.defaults.lookahead_days,
            max_per_day: config.defaults.max_interviews_per_day,
            top_k: config.defaults.top_k,
            high_consensus_spread: config.defaults.high_consensus_spread,
            perspective_timeout: Duration::from_secs(config.defaults.perspective_timeout_secs),
            seed: config.defaults.seed.unwrap_or(DEFAULT_SEED),
            fallback: config.fallback.clone(),
            anchor_date: chrono::Local::now().date_naive(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl PipelineConfig {
    /// Pin the run's notion of "today".
    pub fn with_anchor_date(mut self, date: NaiveDate) -> Self {
        self.anchor_date = date;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject configurations the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.perspectives.is_empty() {
            return Err(JobPlannerError::config("at least one perspective is required"));
        }

        let mut seen = HashSet::new();
        for p in &self.perspectives {
            if p.id.trim().is_empty() {
                return Err(JobPlannerError::config("perspective id must not be empty"));
            }
            if !seen.insert(p.id.as_str()) {
                return Err(JobPlannerError::config(format!(
                    "duplicate perspective id '{}'",
                    p.id
                )));
            }
            if !p.weight.is_finite() || p.weight <= 0.0 {
                return Err(JobPlannerError::config(format!(
                    "perspective '{}' has non-positive weight {}",
                    p.id, p.weight
                )));
            }
        }

        if self.lookahead_days == 0 {
            return Err(JobPlannerError::config("lookahead_days must be at least 1"));
        }
        if self.max_per_day == 0 {
            return Err(JobPlannerError::config(
                "max_interviews_per_day must be at least 1",
            ));
        }
        if !self.high_consensus_spread.is_finite() || self.high_consensus_spread < 0.0 {
            return Err(JobPlannerError::config(
                "high_consensus_spread must be a non-negative number",
            ));
        }

        let rules = &self.fallback;
        if rules.min_score > rules.max_score || rules.max_score > 100 {
            return Err(JobPlannerError::config(format!(
                "fallback score range {}..={} must lie within 0..=100",
                rules.min_score, rules.max_score
            )));
        }
        if rules.tech_bonus > 100 || rules.employer_bonus > 100 {
            return Err(JobPlannerError::config(format!(
                "fallback bonuses ({}, {}) must not exceed 100",
                rules.tech_bonus, rules.employer_bonus
            )));
        }

        Ok(())
    }
}

/// Per-run caller preferences. Unset fields fall back to [`PipelineConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Daily interview cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_day: Option<usize>,
    /// Number of top-ranked candidates to schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

impl Preferences {
    /// Effective `(max_per_day, top_k)` for a run.
    pub fn resolve(&self, config: &PipelineConfig) -> Result<(usize, usize)> {
        let max_per_day = self.max_per_day.unwrap_or(config.max_per_day);
        if max_per_day == 0 {
            return Err(JobPlannerError::validation("max_per_day must be at least 1"));
        }
        Ok((max_per_day, self.top_k.unwrap_or(config.top_k)))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.jobplanner/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| JobPlannerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.jobplanner/jobplanner.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| JobPlannerError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        JobPlannerError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| JobPlannerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| JobPlannerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| JobPlannerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the env var named in the config.
pub fn resolve_api_key(config: &LlmConfig) -> Result<String> {
    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(JobPlannerError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("lookahead_days"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("[[perspectives]]"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_interviews_per_day, 2);
        assert_eq!(parsed.defaults.top_k, 5);
        assert_eq!(parsed.perspectives.len(), 3);
        assert_eq!(parsed.fallback, FallbackRules::default());
    }

    #[test]
    fn config_with_custom_perspectives() {
        let toml_str = r#"
[defaults]
top_k = 3
seed = 7

[[perspectives]]
id = "tech"
display_name = "Tech Lead"
focus_description = "stack depth"
weight = 2.0
focus = "technical"
model = "deepseek-v3"

[[perspectives]]
id = "people"
display_name = "People Partner"
focus_description = "team culture"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.perspectives.len(), 2);
        assert_eq!(config.perspectives[0].model.as_deref(), Some("deepseek-v3"));
        assert_eq!(config.perspectives[1].weight, 1.0);
        assert_eq!(config.defaults.lookahead_days, 14);

        let pipeline = PipelineConfig::from(&config);
        assert_eq!(pipeline.top_k, 3);
        assert_eq!(pipeline.seed, 7);
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn pipeline_config_from_defaults() {
        let pipeline = PipelineConfig::default();
        assert_eq!(pipeline.lookahead_days, 14);
        assert_eq!(pipeline.max_per_day, 2);
        assert_eq!(pipeline.seed, DEFAULT_SEED);
        assert_eq!(pipeline.perspective_timeout, Duration::from_secs(30));
        let weights: Vec<f64> = pipeline.perspectives.iter().map(|p| p.weight).collect();
        assert_eq!(weights, vec![1.2, 1.0, 1.1]);
    }

    #[test]
    fn validation_rejects_bad_perspectives() {
        let mut pipeline = PipelineConfig::default();
        pipeline.perspectives[1].weight = 0.0;
        assert!(pipeline.validate().unwrap_err().to_string().contains("non-positive"));

        let mut pipeline = PipelineConfig::default();
        pipeline.perspectives[2].id = "technical".into();
        assert!(pipeline.validate().unwrap_err().to_string().contains("duplicate"));

        let mut pipeline = PipelineConfig::default();
        pipeline.perspectives.clear();
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_window_and_cap() {
        let mut pipeline = PipelineConfig::default();
        pipeline.lookahead_days = 0;
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.max_per_day = 0;
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.fallback.max_score = 120;
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn validation_rejects_oversized_bonus() {
        let mut pipeline = PipelineConfig::default();
        pipeline.fallback.employer_bonus = u32::MAX;
        let err = pipeline.validate().unwrap_err();
        assert!(err.to_string().contains("bonuses"));

        let mut pipeline = PipelineConfig::default();
        pipeline.fallback.tech_bonus = 100;
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn invalid_api_base_is_rejected() {
        let mut config = AppConfig::default();
        config.llm.api_base = "not a url".into();
        assert!(config.validate().unwrap_err().to_string().contains("api_base"));
    }

    #[test]
    fn preferences_override_config() {
        let pipeline = PipelineConfig::default();
        assert_eq!(Preferences::default().resolve(&pipeline).unwrap(), (2, 5));

        let prefs = Preferences {
            max_per_day: Some(3),
            top_k: Some(1),
        };
        assert_eq!(prefs.resolve(&pipeline).unwrap(), (3, 1));

        let prefs = Preferences {
            max_per_day: Some(0),
            top_k: None,
        };
        assert!(prefs.resolve(&pipeline).is_err());
    }

    #[test]
    fn api_key_resolution() {
        let mut llm = LlmConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        llm.api_key_env = "JP_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&llm);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
