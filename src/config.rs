//! Server settings as seen by the config editor.
//!
//! The server keeps every setting as a string and may omit any of them, so
//! reading is lenient and falls back to the same defaults the server uses.
//! The editor works on the raw text of each field and only coerces numbers
//! when the form is saved.

use crate::state::Config;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "glm-4";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_MAX_HISTORY_ROUNDS: u32 = 10;
/// Same text the server falls back to, so saving defaults changes nothing.
pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个有用的AI助手。";

/// What the server sends back in place of a stored API key.
pub const MASKED_API_KEY: &str = "***已配置***";

pub const MODELS: &[&str] = &["glm-4", "glm-4-plus", "glm-4-air", "glm-4-flash", "glm-4.5"];

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_history_rounds: DEFAULT_MAX_HISTORY_ROUNDS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
        }
    }
}

/// `GET /api/config` body. Any field may be missing, null, or stringly typed.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigPayload {
    zhipu_api_key: Option<Value>,
    model: Option<Value>,
    temperature: Option<Value>,
    max_tokens: Option<Value>,
    max_history_rounds: Option<Value>,
    system_prompt: Option<Value>,
}

fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn number<T: FromStr>(value: Option<Value>) -> Option<T> {
    text(value).and_then(|text| text.trim().parse().ok())
}

impl From<ConfigPayload> for Config {
    fn from(payload: ConfigPayload) -> Self {
        let defaults = Config::default();
        Config {
            api_key: text(payload.zhipu_api_key).unwrap_or(defaults.api_key),
            model: text(payload.model).unwrap_or(defaults.model),
            temperature: number(payload.temperature).unwrap_or(defaults.temperature),
            max_tokens: number(payload.max_tokens).unwrap_or(defaults.max_tokens),
            max_history_rounds: number(payload.max_history_rounds)
                .unwrap_or(defaults.max_history_rounds),
            system_prompt: text(payload.system_prompt).unwrap_or(defaults.system_prompt),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FormError {
    #[error("{field} must be a number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Field-by-field text of the config editor.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigForm {
    pub api_key: String,
    pub model: String,
    pub temperature: String,
    pub max_tokens: String,
    pub max_history_rounds: String,
    pub system_prompt: String,
}

impl From<&Config> for ConfigForm {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature.to_string(),
            max_tokens: config.max_tokens.to_string(),
            max_history_rounds: config.max_history_rounds.to_string(),
            system_prompt: config.system_prompt.clone(),
        }
    }
}

impl Default for ConfigForm {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

fn coerce<T: FromStr>(field: &'static str, value: &str) -> Result<T, FormError> {
    value.trim().parse().map_err(|_| FormError::InvalidNumber {
        field,
        value: value.to_owned(),
    })
}

impl ConfigForm {
    /// Coerces the numeric fields and builds the object to submit.
    pub fn parse(&self) -> Result<Config, FormError> {
        Ok(Config {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            temperature: coerce("temperature", &self.temperature)?,
            max_tokens: coerce("max tokens", &self.max_tokens)?,
            max_history_rounds: coerce("max history rounds", &self.max_history_rounds)?,
            system_prompt: self.system_prompt.clone(),
        })
    }

    /// The server only reports that a key exists, never the key itself.
    pub fn has_stored_key(&self) -> bool {
        self.api_key == MASKED_API_KEY
    }

    /// Known models, plus the current one if the server runs something else.
    pub fn model_options(&self) -> Vec<String> {
        let mut options: Vec<String> = MODELS.iter().map(|model| model.to_string()).collect();
        if !self.model.is_empty() && !options.contains(&self.model) {
            options.push(self.model.clone());
        }
        options
    }
}
