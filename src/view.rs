//! Display-independent view model.
//!
//! Everything the components draw is derived from [`ChatView`] through pure
//! functions, so the synchronization logic can be checked without a DOM.

use crate::config::ConfigForm;
use crate::state::{Conversation, ConversationId, Message, Role, Ticket};
use chrono::NaiveDateTime;
use pulldown_cmark::{Event, Parser, Tag};
use url::{ParseError, Url};

/// Identifies one in-flight send's "thinking" placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Message(Message),
    Pending(PendingId),
}

/// A transcript as last loaded from the server, followed by what was added
/// locally since.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePane {
    loaded: Vec<Message>,
    /// Tagged with the selection they were made under.
    local: Vec<(Ticket, Entry)>,
}

impl MessagePane {
    /// Swaps in a freshly loaded transcript for `ticket`. Local entries made
    /// under the same selection were never part of that snapshot and stay.
    pub fn replace(&mut self, ticket: Ticket, messages: Vec<Message>) {
        self.loaded = messages;
        self.local.retain(|(made_under, _)| *made_under == ticket);
    }

    pub fn push(&mut self, ticket: Ticket, message: Message) {
        self.local.push((ticket, Entry::Message(message)));
    }

    pub fn push_pending(&mut self, ticket: Ticket, id: PendingId) {
        self.local.push((ticket, Entry::Pending(id)));
    }

    /// Removes the placeholder for `id`. Returns whether it was still there.
    pub fn remove_pending(&mut self, id: PendingId) -> bool {
        let before = self.local.len();
        self.local.retain(|(_, entry)| entry != &Entry::Pending(id));
        self.local.len() != before
    }

    pub fn pending_count(&self) -> usize {
        self.local
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Pending(_)))
            .count()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.loaded
            .iter()
            .chain(self.local.iter().filter_map(|(_, entry)| match entry {
                Entry::Message(message) => Some(message),
                Entry::Pending(_) => None,
            }))
    }

    /// Render instructions, top to bottom.
    pub fn rows(&self) -> Vec<Row> {
        if self.loaded.is_empty() && self.local.is_empty() {
            return vec![Row::Empty];
        }
        let loaded = self.loaded.iter().map(message_row);
        let local = self.local.iter().map(|(_, entry)| match entry {
            Entry::Message(message) => message_row(message),
            Entry::Pending(id) => Row::Thinking(*id),
        });
        loaded.chain(local).collect()
    }
}

fn message_row(message: &Message) -> Row {
    Row::Message {
        role: message.role,
        html: render_body(message),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Shown instead of an empty transcript.
    Empty,
    Message { role: Role, html: String },
    Thinking(PendingId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationItem {
    pub id: ConversationId,
    pub title: String,
    pub time: String,
    pub active: bool,
}

/// Sidebar entries in server order. A selection missing from the list
/// simply highlights nothing.
pub fn conversation_items(
    conversations: &[Conversation],
    selected: Option<ConversationId>,
    now: NaiveDateTime,
) -> Vec<ConversationItem> {
    conversations
        .iter()
        .map(|conversation| ConversationItem {
            id: conversation.id,
            title: conversation.title.clone(),
            time: conversation
                .updated_at()
                .map(|at| time_label(at, now))
                .unwrap_or_default(),
            active: Some(conversation.id) == selected,
        })
        .collect()
}

pub fn time_label(at: NaiveDateTime, now: NaiveDateTime) -> String {
    let elapsed = now.signed_duration_since(at);
    if elapsed.num_minutes() < 1 {
        "just now".to_owned()
    } else if elapsed.num_hours() < 1 {
        format!("{} min ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{} h ago", elapsed.num_hours())
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}

/// Links may only point at web pages, mail addresses or relative paths.
fn is_safe_link(dest: &str) -> bool {
    match Url::parse(dest) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "mailto"),
        Err(ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

fn defang(tag: Tag) -> Tag {
    match tag {
        Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        } if !is_safe_link(&dest_url) => Tag::Link {
            link_type,
            dest_url: "#".into(),
            title,
            id,
        },
        Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        } if !is_safe_link(&dest_url) => Tag::Image {
            link_type,
            dest_url: "#".into(),
            title,
            id,
        },
        tag => tag,
    }
}

/// HTML for a message body. User text is shown verbatim; assistant replies
/// are markdown with any embedded HTML turned back into text and unsafe link
/// targets replaced.
pub fn render_body(message: &Message) -> String {
    let mut html = String::new();
    match message.role {
        Role::User => {
            pulldown_cmark_escape::escape_html(&mut html, &message.content).unwrap_or_default();
        }
        Role::Assistant => {
            let parser = Parser::new(&message.content).map(|event| match event {
                Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
                Event::Start(tag) => Event::Start(defang(tag)),
                event => event,
            });
            pulldown_cmark::html::push_html(&mut html, parser);
        }
    }
    html
}

/// Everything on screen at one moment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatView {
    pub conversations: Vec<Conversation>,
    pub selected: Option<ConversationId>,
    pub pane: MessagePane,
    pub input: String,
    /// `Some` while the config editor is open.
    pub editor: Option<ConfigForm>,
}

impl ChatView {
    pub fn conversation_items(&self, now: NaiveDateTime) -> Vec<ConversationItem> {
        conversation_items(&self.conversations, self.selected, now)
    }

    pub fn is_sending(&self) -> bool {
        self.pane.pending_count() > 0
    }
}
