//! Run configuration: `config.json` plus credential overrides from the environment.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use watch_core::{Topic, TopicError};
use watch_engine::{TelegramSettings, TELEGRAM_API_BASE};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "LISTING_WATCH_CONFIG";
pub const API_TOKEN_ENV: &str = "API_TOKEN";
pub const CHAT_ID_ENV: &str = "CHAT_ID";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CHANGE_MARKER: &str = "push_me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("config is not valid json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("missing credential {0}")]
    MissingCredential(&'static str),
    #[error("topic {topic:?}: {reason}")]
    InvalidTopic { topic: String, reason: TopicError },
    #[error("topics {first:?} and {second:?} share the record file {record}")]
    DuplicateRecord {
        first: String,
        second: String,
        record: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    telegram_api_token: Option<String>,
    #[serde(default)]
    chat_id: Option<ChatId>,
    #[serde(default)]
    telegram_api_base: Option<String>,
    #[serde(default)]
    data_dir: Option<PathBuf>,
    #[serde(default)]
    change_marker: Option<PathBuf>,
    projects: Vec<ProjectEntry>,
}

#[derive(Debug, Deserialize)]
struct ProjectEntry {
    topic: String,
    url: String,
    #[serde(default)]
    disabled: bool,
}

/// Chat ids are numeric for groups but often written as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatId {
    Text(String),
    Number(i64),
}

impl ChatId {
    fn into_string(self) -> String {
        match self {
            ChatId::Text(text) => text,
            ChatId::Number(n) => n.to_string(),
        }
    }
}

/// Credential values taken from the process environment, applied over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialOverrides {
    pub api_token: Option<String>,
    pub chat_id: Option<String>,
}

impl CredentialOverrides {
    pub fn from_env() -> Self {
        let read = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            api_token: read(API_TOKEN_ENV),
            chat_id: read(CHAT_ID_ENV),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub topics: Vec<Topic>,
    pub telegram: TelegramSettings,
    pub data_dir: PathBuf,
    pub change_marker: PathBuf,
}

impl Config {
    pub fn load(path: &Path, overrides: &CredentialOverrides) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, overrides)
    }

    pub fn from_json(text: &str, overrides: &CredentialOverrides) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(text)?;

        let token = overrides
            .api_token
            .clone()
            .or(file.telegram_api_token)
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingCredential("telegramApiToken / API_TOKEN"))?;
        let chat_id = overrides
            .chat_id
            .clone()
            .or(file.chat_id.map(ChatId::into_string))
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingCredential("chatId / CHAT_ID"))?;

        let mut telegram = TelegramSettings::new(token, chat_id);
        telegram.api_base = file
            .telegram_api_base
            .unwrap_or_else(|| TELEGRAM_API_BASE.to_string());

        let topics: Vec<Topic> = file
            .projects
            .into_iter()
            .map(|entry| Topic {
                name: entry.topic,
                url: entry.url,
                disabled: entry.disabled,
            })
            .collect();
        validate_topics(&topics)?;

        Ok(Self {
            topics,
            telegram,
            data_dir: file
                .data_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            change_marker: file
                .change_marker
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHANGE_MARKER)),
        })
    }
}

/// Path of the config file: `LISTING_WATCH_CONFIG` if set, else `./config.json`.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

// Disabled topics are never scanned, so they may hold placeholder urls.
fn validate_topics(topics: &[Topic]) -> Result<(), ConfigError> {
    let mut records: HashMap<String, &str> = HashMap::new();
    for topic in topics.iter().filter(|t| t.is_enabled()) {
        topic
            .validate()
            .map_err(|reason| ConfigError::InvalidTopic {
                topic: topic.name.clone(),
                reason,
            })?;
        let record = topic.record_file_name();
        if let Some(first) = records.get(&record) {
            return Err(ConfigError::DuplicateRecord {
                first: first.to_string(),
                second: topic.name.clone(),
                record,
            });
        }
        records.insert(record, &topic.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "telegramApiToken": "file-token",
        "chatId": -100123,
        "projects": [
            { "topic": "sofas", "url": "https://www.example.co.il/furniture?item=sofa" },
            { "topic": "Cars/Trucks", "url": "https://www.example.co.il/vehicles", "disabled": true }
        ]
    }"#;

    #[test]
    fn file_values_and_defaults_are_used() {
        let config = Config::from_json(SAMPLE, &CredentialOverrides::default()).unwrap();
        assert_eq!(config.telegram.token, "file-token");
        assert_eq!(config.telegram.chat_id, "-100123");
        assert_eq!(config.telegram.api_base, TELEGRAM_API_BASE);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.change_marker, PathBuf::from("push_me"));
        assert_eq!(config.topics.len(), 2);
        assert!(config.topics[0].is_enabled());
        assert!(config.topics[1].disabled);
    }

    #[test]
    fn environment_overrides_replace_file_credentials() {
        let overrides = CredentialOverrides {
            api_token: Some("env-token".to_string()),
            chat_id: Some("42".to_string()),
        };
        let config = Config::from_json(SAMPLE, &overrides).unwrap();
        assert_eq!(config.telegram.token, "env-token");
        assert_eq!(config.telegram.chat_id, "42");
    }

    #[test]
    fn missing_token_is_rejected() {
        let text = r#"{ "chatId": "1", "projects": [] }"#;
        let err = Config::from_json(text, &CredentialOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(_)));

        let overrides = CredentialOverrides {
            api_token: Some("t".to_string()),
            chat_id: None,
        };
        assert!(Config::from_json(text, &overrides).is_ok());
    }

    #[test]
    fn enabled_topic_with_bad_url_is_rejected() {
        let text = r#"{ "telegramApiToken": "t", "chatId": "1",
            "projects": [ { "topic": "sofas", "url": "example.com/sofas" } ] }"#;
        let err = Config::from_json(text, &CredentialOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTopic { ref topic, .. } if topic == "sofas"));
    }

    #[test]
    fn disabled_topic_is_not_validated() {
        let text = r#"{ "telegramApiToken": "t", "chatId": "1",
            "projects": [ { "topic": "later", "url": "TODO", "disabled": true } ] }"#;
        assert!(Config::from_json(text, &CredentialOverrides::default()).is_ok());
    }

    #[test]
    fn duplicate_topics_are_rejected() {
        let text = r#"{ "telegramApiToken": "t", "chatId": "1", "projects": [
            { "topic": "sofas", "url": "https://example.com/a" },
            { "topic": " sofas ", "url": "https://example.com/b" } ] }"#;
        let err = Config::from_json(text, &CredentialOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRecord { .. }));
    }

    #[test]
    fn unreadable_file_reports_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("missing.json");
        let err = Config::load(&path, &CredentialOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { path: ref p, .. } if p == &path));
    }

    #[test]
    fn config_file_is_loaded_from_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, SAMPLE).unwrap();
        let config = Config::load(&path, &CredentialOverrides::default()).unwrap();
        assert_eq!(config.topics[0].name, "sofas");
    }
}
