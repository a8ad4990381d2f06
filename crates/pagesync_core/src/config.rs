use std::env;
use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::error::{Result, SyncError};

pub const TOKEN_ENV: &str = "TOKEN";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const PAGES_DIR_ENV: &str = "PAGES_DIR";
pub const EDITOR_ENV: &str = "PAGESYNC_EDITOR";
pub const USER_AGENT_ENV: &str = "PAGESYNC_USER_AGENT";

pub const DEFAULT_PAGES_DIR: &str = "pages";
pub const DEFAULT_EDITOR: &str = "code";
pub const DEFAULT_USER_AGENT: &str = concat!("pagesync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Default => "default",
        }
    }
}

/// Resolved runtime settings, built once at startup and handed to every
/// component that needs them.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub token: String,
    pub base_url: Url,
    pub pages_dir: PathBuf,
    pub pages_dir_source: ValueSource,
    pub editor: String,
    pub user_agent: String,
}

impl SyncConfig {
    pub fn from_env(pages_dir_override: Option<&Path>) -> Result<Self> {
        Self::from_lookup(pages_dir_override, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(pages_dir_override: Option<&Path>, lookup_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            lookup_env(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let token = lookup(TOKEN_ENV).ok_or(SyncError::MissingEnv { name: TOKEN_ENV })?;
        let raw_base_url =
            lookup(BASE_URL_ENV).ok_or(SyncError::MissingEnv { name: BASE_URL_ENV })?;
        let base_url = parse_base_url(&raw_base_url)?;

        let (pages_dir, pages_dir_source) = if let Some(path) = pages_dir_override {
            (path.to_path_buf(), ValueSource::Flag)
        } else if let Some(value) = lookup(PAGES_DIR_ENV) {
            (PathBuf::from(value), ValueSource::Env)
        } else {
            (PathBuf::from(DEFAULT_PAGES_DIR), ValueSource::Default)
        };

        let editor = lookup(EDITOR_ENV)
            .or_else(|| lookup("EDITOR"))
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
        let user_agent =
            lookup(USER_AGENT_ENV).unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Ok(Self {
            token,
            base_url,
            pages_dir,
            pages_dir_source,
            editor,
            user_agent,
        })
    }

    /// Resolve an API path such as `pages/show` against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|error| SyncError::InvalidBaseUrl {
                value: self.base_url.to_string(),
                reason: error.to_string(),
            })
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "base_url={}\ntoken={}\npages_dir={} ({})\neditor={}\nuser_agent={}",
            self.base_url,
            redact(&self.token),
            self.pages_dir.to_string_lossy().replace('\\', "/"),
            self.pages_dir_source.as_str(),
            self.editor,
            self.user_agent,
        )
    }
}

fn parse_base_url(value: &str) -> Result<Url> {
    // Url::join drops the last path segment unless the base ends in '/'.
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };
    let url = Url::parse(&normalized).map_err(|error| SyncError::InvalidBaseUrl {
        value: value.to_string(),
        reason: error.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(SyncError::InvalidBaseUrl {
            value: value.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }
    Ok(url)
}

/// First four characters of the token, or none of it when that would
/// reveal the whole value.
fn redact(token: &str) -> String {
    if token.chars().count() <= 4 {
        return "***".to_string();
    }
    let visible: String = token.chars().take(4).collect();
    format!("{visible}***")
}
