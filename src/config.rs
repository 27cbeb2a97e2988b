use std::time::Duration;

use chatgpt::config::ChatGPTEngine;
use thiserror::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub chatgpt_api_key: String,
    pub engine: ChatGPTEngine,
    pub ai_timeout: Duration,
    /// Sqlite file for dialogue state; kept in memory when `None`.
    pub dialogue_db: Option<String>,
}

impl Config {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let chatgpt_api_key =
            present("CHATGPT_API_KEY").ok_or(ConfigError::Missing("CHATGPT_API_KEY"))?;

        let engine = match present("TRIVIA_ENGINE") {
            None => ChatGPTEngine::Gpt35Turbo,
            Some(value) => parse_engine(&value).ok_or(ConfigError::Invalid {
                name: "TRIVIA_ENGINE",
                value,
                reason: "expected gpt-3.5-turbo, gpt-4 or gpt-4-32k",
            })?,
        };

        let ai_timeout = match present("TRIVIA_AI_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "TRIVIA_AI_TIMEOUT_SECS",
                        value,
                        reason: "expected a positive number of seconds",
                    })
                }
            },
        };

        Ok(Self {
            chatgpt_api_key,
            engine,
            ai_timeout,
            dialogue_db: present("TRIVIA_DIALOGUE_DB"),
        })
    }
}

fn parse_engine(value: &str) -> Option<ChatGPTEngine> {
    match value.trim().to_lowercase().as_str() {
        "gpt-3.5-turbo" => Some(ChatGPTEngine::Gpt35Turbo),
        "gpt-4" => Some(ChatGPTEngine::Gpt4),
        "gpt-4-32k" => Some(ChatGPTEngine::Gpt4_32k),
        _ => None,
    }
}
