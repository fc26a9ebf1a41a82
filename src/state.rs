use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ConversationId(pub u32);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    /// Kept verbatim: the server emits both SQLite `CURRENT_TIMESTAMP` and
    /// ISO 8601 strings depending on which code path touched the row.
    pub updated_at: String,
}

impl Conversation {
    pub fn updated_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.updated_at)
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "AI",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Server-side settings, always written back as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    #[serde(rename = "zhipu_api_key")]
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_history_rounds: u32,
    pub system_prompt: String,
}

/// Token handed out when a conversation is selected. A message load only
/// applies its result while its ticket is still the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub conversation: ConversationId,
    generation: u64,
}

/// The only mutable process-wide state: which conversation is on screen.
#[derive(Debug, Default)]
pub struct Session {
    selected: Option<ConversationId>,
    generation: u64,
    list_generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `id` without checking that it exists.
    pub fn select(&mut self, id: ConversationId) -> Ticket {
        self.selected = Some(id);
        self.generation += 1;
        Ticket {
            conversation: id,
            generation: self.generation,
        }
    }

    pub fn current(&self) -> Option<ConversationId> {
        self.selected
    }

    pub fn current_ticket(&self) -> Option<Ticket> {
        self.selected.map(|conversation| Ticket {
            conversation,
            generation: self.generation,
        })
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.selected == Some(ticket.conversation) && self.generation == ticket.generation
    }

    pub fn begin_list_load(&mut self) -> u64 {
        self.list_generation += 1;
        self.list_generation
    }

    pub fn is_latest_list(&self, token: u64) -> bool {
        self.list_generation == token
    }
}
