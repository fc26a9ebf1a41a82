//! HTTP access to the chat server.
//!
//! [`Transport`] is the raw JSON round trip, [`Api`] the typed endpoints on
//! top of it.

use crate::config::ConfigPayload;
use crate::state::{Config, Conversation, ConversationId, Message};
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The round trip did not complete.
    #[error("Network error {0}")]
    Network(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },
}

impl Error {
    /// Builds a status error out of a response body carrying an `error` field.
    pub fn status(status: u16, body: &Value) -> Self {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("HTTP {status}"));
        Error::Status { status, message }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, Error::Status { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(value.to_string())
    }
}

#[async_trait(?Send)]
pub trait Transport {
    async fn get(&self, path: &str) -> Result<Value, Error>;
    async fn post(&self, path: &str, body: Value) -> Result<Value, Error>;
    async fn put(&self, path: &str, body: Value) -> Result<Value, Error>;
}

#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn read(response: reqwest::Response) -> Result<Value, Error> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<Value>().await?)
        } else {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            Err(Error::status(status.as_u16(), &body))
        }
    }
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Value, Error> {
        debug!("GET {path}");
        let response = self.client.get(self.url(path)).send().await?;
        Self::read(response).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, Error> {
        debug!("POST {path}");
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        Self::read(response).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, Error> {
        debug!("PUT {path}");
        let response = self.client.put(self.url(path)).json(&body).send().await?;
        Self::read(response).await
    }
}

#[derive(Deserialize)]
struct ConversationList {
    conversations: Vec<Conversation>,
}

#[derive(Deserialize)]
struct MessageList {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct Reply {
    message: Message,
}

#[derive(Serialize)]
struct Title<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct NewMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(default)]
    pub error: Option<String>,
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    Ok(serde_json::from_value(value)?)
}

fn encode<T: Serialize>(value: &T) -> Result<Value, Error> {
    Ok(serde_json::to_value(value)?)
}

fn messages_path(id: ConversationId) -> String {
    format!("/api/conversations/{id}/messages")
}

/// Typed endpoints of the chat server.
pub struct Api<T> {
    transport: T,
}

impl<T: Transport> Api<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub async fn conversations(&self) -> Result<Vec<Conversation>, Error> {
        let list: ConversationList = decode(self.transport.get("/api/conversations").await?)?;
        Ok(list.conversations)
    }

    pub async fn create_conversation(&self, title: &str) -> Result<Conversation, Error> {
        let body = encode(&Title { title })?;
        decode(self.transport.post("/api/conversations", body).await?)
    }

    pub async fn rename_conversation(
        &self,
        id: ConversationId,
        title: &str,
    ) -> Result<Conversation, Error> {
        let body = encode(&Title { title })?;
        let path = format!("/api/conversations/{id}");
        decode(self.transport.put(&path, body).await?)
    }

    pub async fn messages(&self, id: ConversationId) -> Result<Vec<Message>, Error> {
        let list: MessageList = decode(self.transport.get(&messages_path(id)).await?)?;
        Ok(list.messages)
    }

    /// Posts a user message and returns the assistant's reply.
    pub async fn send_message(&self, id: ConversationId, content: &str) -> Result<Message, Error> {
        let body = encode(&NewMessage { content })?;
        let reply: Reply = decode(self.transport.post(&messages_path(id), body).await?)?;
        Ok(reply.message)
    }

    pub async fn config(&self) -> Result<Config, Error> {
        let payload: ConfigPayload = decode(self.transport.get("/api/config").await?)?;
        Ok(payload.into())
    }

    pub async fn save_config(&self, config: &Config) -> Result<(), Error> {
        let body = encode(config)?;
        self.transport.post("/api/config", body).await?;
        Ok(())
    }

    pub async fn validate_config(&self) -> Result<Validation, Error> {
        decode(
            self.transport
                .post("/api/config/validate", Value::Object(Default::default()))
                .await?,
        )
    }
}
