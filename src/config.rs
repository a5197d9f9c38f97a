use anyhow::{Context, Result};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{FeedbackMethod, SearchMethod};
use crate::constants::constants;

/// User preferences from `config.toml`. Every field is optional.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub api_base: Option<String>,
  pub share_base: Option<String>,
  pub embed_base: Option<String>,
  pub search_method: Option<SearchMethod>,
  pub feedback_method: Option<FeedbackMethod>,
  pub request_timeout_secs: Option<u64>,
  pub log_level: Option<String>,
}

pub fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "fastsearch")
}

fn config_file() -> Option<PathBuf> {
  project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
  pub fn load() -> Self {
    if let Some(path) = config_file()
      && let Ok(content) = std::fs::read_to_string(path)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }
    Self::default()
  }

  pub fn save(&self) -> Result<PathBuf> {
    let path = config_file().context("No config directory for this platform")?;
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = toml::to_string(self).context("Failed to serialize config")?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
  }

  /// Overlay `other`'s set fields on top of `self`.
  pub fn merge(self, other: Config) -> Config {
    Config {
      api_base: other.api_base.or(self.api_base),
      share_base: other.share_base.or(self.share_base),
      embed_base: other.embed_base.or(self.embed_base),
      search_method: other.search_method.or(self.search_method),
      feedback_method: other.feedback_method.or(self.feedback_method),
      request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
      log_level: other.log_level.or(self.log_level),
    }
  }
}

/// Fully resolved, validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
  pub search_url: Url,
  pub feedback_url: Url,
  pub share_base: Url,
  pub embed_base: Url,
  pub search_method: SearchMethod,
  pub feedback_method: FeedbackMethod,
  pub request_timeout: Duration,
  pub notice_ttl: Duration,
  pub poll_interval: Duration,
  pub log_level: String,
}

impl Settings {
  pub fn resolve(config: &Config) -> Result<Self> {
    let c = constants();
    let api_base = config.api_base.as_deref().unwrap_or(&c.api_base);
    let api_base = Url::parse(api_base).with_context(|| format!("Invalid api_base: {api_base}"))?;
    let share_base = config.share_base.as_deref().unwrap_or(&c.share_base);
    let embed_base = config.embed_base.as_deref().unwrap_or(&c.embed_base);

    Ok(Self {
      search_url: api_base.join(&c.search_path).context("Failed to build search URL")?,
      feedback_url: api_base.join(&c.feedback_path).context("Failed to build feedback URL")?,
      share_base: Url::parse(share_base).with_context(|| format!("Invalid share_base: {share_base}"))?,
      embed_base: Url::parse(embed_base).with_context(|| format!("Invalid embed_base: {embed_base}"))?,
      search_method: config.search_method.unwrap_or_default(),
      feedback_method: config.feedback_method.unwrap_or_default(),
      request_timeout: Duration::from_secs(config.request_timeout_secs.unwrap_or(c.request_timeout_secs)),
      notice_ttl: Duration::from_secs(c.notice_ttl_secs),
      poll_interval: Duration::from_millis(c.poll_interval_ms),
      log_level: config.log_level.clone().unwrap_or_else(|| "info".to_string()),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_resolve() {
    let s = Settings::resolve(&Config::default()).unwrap();
    assert_eq!(s.search_url.as_str(), "http://localhost:8000/api/search");
    assert_eq!(s.feedback_url.as_str(), "http://localhost:8000/api/feedback");
    assert_eq!(s.search_method, SearchMethod::Get);
    assert_eq!(s.feedback_method, FeedbackMethod::Post);
    assert_eq!(s.log_level, "info");
  }

  #[test]
  fn endpoints_join_onto_api_base() {
    let config = Config { api_base: Some("https://api.example.com/v2/".to_string()), ..Config::default() };
    let s = Settings::resolve(&config).unwrap();
    // Absolute paths replace the base path.
    assert_eq!(s.search_url.as_str(), "https://api.example.com/api/search");
  }

  #[test]
  fn invalid_urls_fail() {
    let config = Config { share_base: Some("nope".to_string()), ..Config::default() };
    assert!(Settings::resolve(&config).is_err());
  }

  #[test]
  fn parses_toml() {
    let config: Config = toml::from_str(
      r#"
        api_base = "https://fastsearch.danteoz.com"
        search_method = "post"
        feedback_method = "put"
        request_timeout_secs = 3
      "#,
    )
    .unwrap();
    assert_eq!(config.search_method, Some(SearchMethod::Post));
    assert_eq!(config.feedback_method, Some(FeedbackMethod::Put));
    assert_eq!(config.request_timeout_secs, Some(3));
    assert!(config.log_level.is_none());
  }

  #[test]
  fn merge_prefers_overrides() {
    let file = Config { api_base: Some("http://a".to_string()), log_level: Some("debug".to_string()), ..Config::default() };
    let cli = Config { api_base: Some("http://b".to_string()), ..Config::default() };
    let merged = file.merge(cli);
    assert_eq!(merged.api_base.as_deref(), Some("http://b"));
    assert_eq!(merged.log_level.as_deref(), Some("debug"));
  }
}
