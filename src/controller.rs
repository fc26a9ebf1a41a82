//! Keeps the selected conversation, the rendered transcript and the server in
//! step.
//!
//! Every operation is one or more request/response round trips. Requests may
//! interleave, so each result is checked against the live session before it
//! touches the view.

use crate::api::{Api, Error as ApiError, Transport, Validation};
use crate::config::ConfigForm;
use crate::state::{ConversationId, Message, Session};
use crate::view::{ChatView, PendingId};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};

pub const DEFAULT_TITLE: &str = "New conversation";
pub const NETWORK_FAILURE: &str = "Failed to send the message, please check your network connection";

/// Where the controller's output goes.
pub trait Hooks {
    /// Called with the full view after every change.
    fn render(&self, view: &ChatView);

    /// Blocking notification.
    fn alert(&self, message: &str);

    /// Failures that are not shown to the user.
    fn report(&self, context: &str, error: &ApiError) {
        warn!("{context}: {error}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Type a message first")]
    EmptyInput,

    #[error("Select or create a conversation first")]
    NoConversation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Stopped before any request was made.
    Rejected(Rejection),
    Replied,
    /// Server-supplied error text, shown in the transcript.
    ServerError(String),
    NetworkError,
}

fn describe(action: &str, error: &ApiError) -> String {
    match error {
        ApiError::Status { message, .. } => format!("{action}: {message}"),
        _ => action.to_owned(),
    }
}

pub struct ChatController<T, H> {
    api: Api<T>,
    hooks: H,
    session: RefCell<Session>,
    view: RefCell<ChatView>,
    next_pending: Cell<u64>,
}

impl<T: Transport, H: Hooks> ChatController<T, H> {
    pub fn new(api: Api<T>, hooks: H) -> Self {
        Self {
            api,
            hooks,
            session: RefCell::new(Session::new()),
            view: RefCell::new(ChatView::default()),
            next_pending: Cell::new(0),
        }
    }

    #[cfg(test)]
    pub fn view(&self) -> ChatView {
        self.view.borrow().clone()
    }

    pub fn selected(&self) -> Option<ConversationId> {
        self.session.borrow().current()
    }

    fn update(&self, change: impl FnOnce(&mut ChatView)) {
        let snapshot = {
            let mut view = self.view.borrow_mut();
            change(&mut view);
            view.clone()
        };
        self.hooks.render(&snapshot);
    }

    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|view| view.input = text);
    }

    /// Reloads the conversation list. Failures leave the old list in place.
    pub async fn refresh_list(&self) {
        let token = self.session.borrow_mut().begin_list_load();
        match self.api.conversations().await {
            Ok(conversations) => {
                if !self.session.borrow().is_latest_list(token) {
                    debug!("Dropping stale conversation list");
                    return;
                }
                let selected = self.selected();
                self.update(|view| {
                    view.conversations = conversations;
                    view.selected = selected;
                });
            }
            Err(err) => self.hooks.report("Failed to load conversations", &err),
        }
    }

    /// Selects `id` and replaces the transcript with its messages.
    pub async fn open_conversation(&self, id: ConversationId) {
        let ticket = self.session.borrow_mut().select(id);
        self.update(|view| view.selected = Some(id));
        match self.api.messages(id).await {
            Ok(messages) => {
                if !self.session.borrow().is_current(&ticket) {
                    debug!("Dropping stale messages for conversation {id}");
                    return;
                }
                self.update(|view| view.pane.replace(ticket, messages));
            }
            Err(err) => self
                .hooks
                .report(&format!("Failed to load conversation {id}"), &err),
        }
    }

    pub async fn create_conversation(&self, title: &str) {
        match self.api.create_conversation(title).await {
            Ok(conversation) => {
                info!("Created conversation {}", conversation.id);
                self.refresh_list().await;
                self.open_conversation(conversation.id).await;
                self.update(|view| view.input.clear());
            }
            Err(err) => {
                self.hooks.report("Failed to create conversation", &err);
                self.hooks
                    .alert(&describe("Failed to create conversation", &err));
            }
        }
    }

    pub async fn rename_conversation(&self, id: ConversationId, title: &str) {
        let title = title.trim();
        if title.is_empty() {
            self.hooks.alert("Title cannot be empty");
            return;
        }
        match self.api.rename_conversation(id, title).await {
            Ok(_) => self.refresh_list().await,
            Err(err) => {
                self.hooks.report("Failed to rename conversation", &err);
                self.hooks
                    .alert(&describe("Failed to rename conversation", &err));
            }
        }
    }

    fn reject(&self, rejection: Rejection) -> SendOutcome {
        self.hooks.alert(&rejection.to_string());
        SendOutcome::Rejected(rejection)
    }

    /// Sends the composer text to the selected conversation.
    ///
    /// The user's text is echoed at once and never rolled back. Each send
    /// owns its own placeholder, so overlapping sends resolve independently.
    pub async fn send(&self) -> SendOutcome {
        let content = self.view.borrow().input.trim().to_owned();
        if content.is_empty() {
            return self.reject(Rejection::EmptyInput);
        }
        let ticket = self.session.borrow().current_ticket();
        let Some(ticket) = ticket else {
            return self.reject(Rejection::NoConversation);
        };

        let pending = PendingId(self.next_pending.get());
        self.next_pending.set(pending.0 + 1);
        self.update(|view| {
            view.input.clear();
            view.pane.push(ticket, Message::user(content.clone()));
            view.pane.push_pending(ticket, pending);
        });

        let result = self.api.send_message(ticket.conversation, &content).await;
        let (outcome, reply) = match result {
            Ok(message) => (SendOutcome::Replied, message),
            Err(err) if err.is_status() => {
                warn!("Server refused message: {err}");
                (
                    SendOutcome::ServerError(err.to_string()),
                    Message::assistant(format!("Error: {err}")),
                )
            }
            Err(err) => {
                self.hooks.report("Failed to send message", &err);
                (SendOutcome::NetworkError, Message::assistant(NETWORK_FAILURE))
            }
        };

        // The transcript may have been reloaded meanwhile; the placeholder
        // id is unique so removing it is always safe.
        let live = self.session.borrow().is_current(&ticket);
        self.update(|view| {
            view.pane.remove_pending(pending);
            if live {
                view.pane.push(ticket, reply);
            }
        });

        if outcome == SendOutcome::Replied {
            self.refresh_list().await;
        }
        outcome
    }

    /// Opens the config editor. A failed load opens it with defaults.
    pub async fn open_config(&self) {
        let form = match self.api.config().await {
            Ok(config) => ConfigForm::from(&config),
            Err(err) => {
                self.hooks.report("Failed to load configuration", &err);
                ConfigForm::default()
            }
        };
        self.update(|view| view.editor = Some(form));
    }

    pub fn edit_config(&self, edit: impl FnOnce(&mut ConfigForm)) {
        self.update(|view| {
            if let Some(form) = view.editor.as_mut() {
                edit(form);
            }
        });
    }

    pub fn close_config(&self) {
        self.update(|view| view.editor = None);
    }

    /// Submits the whole form. Returns whether the editor was closed.
    pub async fn save_config(&self) -> bool {
        let editor = self.view.borrow().editor.clone();
        let Some(form) = editor else {
            return false;
        };
        let config = match form.parse() {
            Ok(config) => config,
            Err(err) => {
                self.hooks.alert(&err.to_string());
                return false;
            }
        };
        match self.api.save_config(&config).await {
            Ok(()) => {
                info!("Saved configuration for model {}", config.model);
                self.close_config();
                self.hooks.alert("Configuration saved");
                true
            }
            Err(err) => {
                self.hooks.report("Failed to save configuration", &err);
                self.hooks
                    .alert(&describe("Failed to save configuration", &err));
                false
            }
        }
    }

    pub async fn validate_config(&self) {
        match self.api.validate_config().await {
            Ok(Validation { valid: true, .. }) => self.hooks.alert("API key is valid"),
            Ok(Validation { error, .. }) => self.hooks.alert(&format!(
                "API key is not valid: {}",
                error.as_deref().unwrap_or("rejected by the provider")
            )),
            Err(err) => {
                self.hooks.report("Failed to validate API key", &err);
                self.hooks
                    .alert(&describe("Failed to validate API key", &err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{Call, Canned, MockTransport};
    use crate::config::DEFAULT_SYSTEM_PROMPT;
    use crate::state::Role;
    use crate::view::Row;
    use futures::executor::block_on;
    use futures::{pin_mut, poll};
    use serde_json::{json, Value};
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Render(ChatView),
        Alert(String),
        Report(String),
        Request(String),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        log: Rc<RefCell<Vec<Event>>>,
    }

    impl Recorder {
        fn alerts(&self) -> Vec<String> {
            self.log
                .borrow()
                .iter()
                .filter_map(|event| match event {
                    Event::Alert(text) => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }

        fn reports(&self) -> usize {
            self.log
                .borrow()
                .iter()
                .filter(|event| matches!(event, Event::Report(_)))
                .count()
        }

        /// The last view rendered before `request` was issued.
        fn view_before(&self, request: &str) -> ChatView {
            let log = self.log.borrow();
            let at = log
                .iter()
                .position(|event| event == &Event::Request(request.to_owned()))
                .expect("request was never made");
            log[..at]
                .iter()
                .rev()
                .find_map(|event| match event {
                    Event::Render(view) => Some(view.clone()),
                    _ => None,
                })
                .expect("nothing rendered")
        }
    }

    impl Hooks for Recorder {
        fn render(&self, view: &ChatView) {
            self.log.borrow_mut().push(Event::Render(view.clone()));
        }

        fn alert(&self, message: &str) {
            self.log.borrow_mut().push(Event::Alert(message.to_owned()));
        }

        fn report(&self, context: &str, error: &ApiError) {
            self.log
                .borrow_mut()
                .push(Event::Report(format!("{context}: {error}")));
        }
    }

    type Chat = ChatController<MockTransport, Recorder>;

    fn setup() -> (Chat, MockTransport, Recorder) {
        let mock = MockTransport::default();
        let hooks = Recorder::default();
        let log = hooks.log.clone();
        *mock.on_call.borrow_mut() = Some(Box::new(move |call: &Call| {
            log.borrow_mut()
                .push(Event::Request(format!("{} {}", call.method, call.path)));
        }));
        let chat = ChatController::new(Api::new(mock.clone()), hooks.clone());
        (chat, mock, hooks)
    }

    fn messages(list: &[(&str, &str)]) -> Value {
        let messages: Vec<Value> = list
            .iter()
            .map(|(role, content)| json!({"role": role, "content": content}))
            .collect();
        json!({ "messages": messages })
    }

    fn list(ids: &[u32]) -> Value {
        let conversations: Vec<Value> = ids
            .iter()
            .map(|id| json!({"id": id, "title": format!("conv {id}"), "updated_at": "2024-05-01 10:00:00"}))
            .collect();
        json!({ "conversations": conversations })
    }

    fn open(chat: &Chat, mock: &MockTransport, id: u32, body: Value) {
        mock.reply(
            "GET",
            &format!("/api/conversations/{id}/messages"),
            Canned::Ok(body),
        );
        block_on(chat.open_conversation(ConversationId(id)));
    }

    fn contents(view: &ChatView) -> Vec<(Role, String)> {
        view.pane
            .messages()
            .map(|message| (message.role, message.content.clone()))
            .collect()
    }

    #[test]
    fn send_echoes_and_clears_before_the_request() {
        let (chat, mock, hooks) = setup();
        open(&chat, &mock, 1, messages(&[]));
        mock.reply(
            "POST",
            "/api/conversations/1/messages",
            Canned::Ok(json!({"message": {"role": "assistant", "content": "pong"}})),
        );
        mock.reply("GET", "/api/conversations", Canned::Ok(list(&[1])));

        chat.set_input("  ping \n");
        assert_eq!(block_on(chat.send()), SendOutcome::Replied);

        let during = hooks.view_before("POST /api/conversations/1/messages");
        assert_eq!(during.input, "");
        assert_eq!(during.pane.pending_count(), 1);
        assert_eq!(
            contents(&during),
            vec![(Role::User, "ping".to_owned())]
        );

        let after = chat.view();
        assert_eq!(after.pane.pending_count(), 0);
        assert_eq!(
            contents(&after),
            vec![
                (Role::User, "ping".to_owned()),
                (Role::Assistant, "pong".to_owned())
            ]
        );
        assert_eq!(
            mock.calls.borrow()[1].body,
            Some(json!({"content": "ping"}))
        );
        // Refreshed to pick up the new ordering.
        assert_eq!(mock.calls_to("GET", "/api/conversations"), 1);
        assert_eq!(after.conversations.len(), 1);
        assert!(hooks.alerts().is_empty());
    }

    #[test]
    fn typing_leaves_the_pane_untouched() {
        let (chat, mock, hooks) = setup();
        open(&chat, &mock, 1, messages(&[("assistant", "**hello**")]));
        let before = chat.view().pane;
        hooks.log.borrow_mut().clear();

        for text in ["h", "he", "hey"] {
            chat.set_input(text);
        }
        let log = hooks.log.borrow();
        assert_eq!(log.len(), 3);
        assert!(log.iter().all(|event| match event {
            Event::Render(view) => view.pane == before,
            _ => false,
        }));
    }

    #[test]
    fn blank_input_makes_no_request() {
        let (chat, mock, hooks) = setup();
        open(&chat, &mock, 1, messages(&[]));
        for input in ["", "   ", "\n\t"] {
            chat.set_input(input);
            assert_eq!(
                block_on(chat.send()),
                SendOutcome::Rejected(Rejection::EmptyInput)
            );
        }
        assert_eq!(mock.calls.borrow().len(), 1);
        assert_eq!(hooks.alerts().len(), 3);
    }

    #[test]
    fn send_without_selection_is_rejected() {
        let (chat, mock, hooks) = setup();
        chat.set_input("hello");
        assert_eq!(
            block_on(chat.send()),
            SendOutcome::Rejected(Rejection::NoConversation)
        );
        assert!(mock.calls.borrow().is_empty());
        assert_eq!(
            hooks.alerts(),
            vec![Rejection::NoConversation.to_string()]
        );
        // Nothing was echoed and the text is kept.
        assert_eq!(chat.view().input, "hello");
        assert_eq!(chat.view().pane.rows(), vec![Row::Empty]);
    }

    #[test]
    fn server_error_is_shown_inline() {
        let (chat, mock, hooks) = setup();
        open(&chat, &mock, 1, messages(&[]));
        mock.reply(
            "POST",
            "/api/conversations/1/messages",
            Canned::Status(429, json!({"error": "rate limited"})),
        );
        chat.set_input("hi");
        assert_eq!(
            block_on(chat.send()),
            SendOutcome::ServerError("rate limited".into())
        );

        let view = chat.view();
        assert_eq!(view.pane.pending_count(), 0);
        let last = view.pane.messages().last().cloned().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("rate limited"));
        // The echo stays.
        assert_eq!(view.pane.messages().next(), Some(&Message::user("hi")));
        assert_eq!(mock.calls_to("GET", "/api/conversations"), 0);
        assert!(hooks.alerts().is_empty());
    }

    #[test]
    fn network_error_is_shown_inline() {
        let (chat, mock, hooks) = setup();
        open(&chat, &mock, 1, messages(&[]));
        mock.reply("POST", "/api/conversations/1/messages", Canned::Network);
        chat.set_input("hi");
        assert_eq!(block_on(chat.send()), SendOutcome::NetworkError);

        let view = chat.view();
        assert_eq!(view.pane.pending_count(), 0);
        assert_eq!(
            view.pane.messages().last(),
            Some(&Message::assistant(NETWORK_FAILURE))
        );
        assert_eq!(hooks.reports(), 1);
    }

    #[test]
    fn overlapping_sends_keep_their_own_placeholders() {
        let (chat, mock, _) = setup();
        open(&chat, &mock, 1, messages(&[]));
        let path = "/api/conversations/1/messages";
        let first_gate = mock.gate(
            "POST",
            path,
            Canned::Status(500, json!({"error": "first failed"})),
        );
        let second_gate = mock.gate(
            "POST",
            path,
            Canned::Ok(json!({"message": {"role": "assistant", "content": "second"}})),
        );
        mock.reply("GET", "/api/conversations", Canned::Ok(list(&[1])));

        block_on(async {
            chat.set_input("one");
            let first = chat.send();
            pin_mut!(first);
            assert!(poll!(first.as_mut()).is_pending());

            chat.set_input("two");
            let second = chat.send();
            pin_mut!(second);
            assert!(poll!(second.as_mut()).is_pending());
            assert_eq!(chat.view().pane.pending_count(), 2);

            second_gate.send(()).unwrap();
            assert_eq!(second.await, SendOutcome::Replied);
            let view = chat.view();
            assert_eq!(view.pane.pending_count(), 1);
            assert!(matches!(view.pane.rows()[1], Row::Thinking(_)));

            first_gate.send(()).unwrap();
            assert_eq!(
                first.await,
                SendOutcome::ServerError("first failed".into())
            );
        });

        let view = chat.view();
        assert_eq!(view.pane.pending_count(), 0);
        assert_eq!(
            contents(&view),
            vec![
                (Role::User, "one".to_owned()),
                (Role::User, "two".to_owned()),
                (Role::Assistant, "second".to_owned()),
                (Role::Assistant, "Error: first failed".to_owned()),
            ]
        );
    }

    #[test]
    fn echo_survives_a_load_that_lands_mid_send() {
        let (chat, mock, _) = setup();
        let load = mock.gate(
            "GET",
            "/api/conversations/2/messages",
            Canned::Ok(messages(&[("assistant", "old B")])),
        );
        let reply = mock.gate(
            "POST",
            "/api/conversations/2/messages",
            Canned::Ok(json!({"message": {"role": "assistant", "content": "answer to hi"}})),
        );
        mock.reply("GET", "/api/conversations", Canned::Ok(list(&[2])));

        block_on(async {
            let opening = chat.open_conversation(ConversationId(2));
            pin_mut!(opening);
            assert!(poll!(opening.as_mut()).is_pending());

            chat.set_input("hi");
            let sending = chat.send();
            pin_mut!(sending);
            assert!(poll!(sending.as_mut()).is_pending());

            load.send(()).unwrap();
            opening.await;
            let view = chat.view();
            assert_eq!(view.pane.pending_count(), 1);
            assert_eq!(
                contents(&view),
                vec![
                    (Role::Assistant, "old B".to_owned()),
                    (Role::User, "hi".to_owned())
                ]
            );

            reply.send(()).unwrap();
            assert_eq!(sending.await, SendOutcome::Replied);
        });

        let view = chat.view();
        assert_eq!(view.pane.pending_count(), 0);
        assert_eq!(
            contents(&view),
            vec![
                (Role::Assistant, "old B".to_owned()),
                (Role::User, "hi".to_owned()),
                (Role::Assistant, "answer to hi".to_owned())
            ]
        );
    }

    #[test]
    fn late_messages_for_an_old_selection_are_dropped() {
        let (chat, mock, _) = setup();
        let gate = mock.gate(
            "GET",
            "/api/conversations/1/messages",
            Canned::Ok(messages(&[("user", "from A")])),
        );
        mock.reply(
            "GET",
            "/api/conversations/2/messages",
            Canned::Ok(messages(&[("user", "from B")])),
        );

        block_on(async {
            let load_a = chat.open_conversation(ConversationId(1));
            pin_mut!(load_a);
            assert!(poll!(load_a.as_mut()).is_pending());

            chat.open_conversation(ConversationId(2)).await;
            gate.send(()).unwrap();
            load_a.await;
        });

        let view = chat.view();
        assert_eq!(chat.selected(), Some(ConversationId(2)));
        assert_eq!(view.selected, Some(ConversationId(2)));
        assert_eq!(contents(&view), vec![(Role::User, "from B".to_owned())]);
    }

    #[test]
    fn switching_back_shows_only_the_first_conversation() {
        let (chat, mock, _) = setup();
        let a = messages(&[("user", "a1"), ("assistant", "a2")]);
        open(&chat, &mock, 1, a.clone());
        let first = contents(&chat.view());
        open(&chat, &mock, 2, messages(&[("user", "b1")]));
        open(&chat, &mock, 1, a);
        assert_eq!(contents(&chat.view()), first);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn empty_conversation_renders_placeholder() {
        let (chat, mock, _) = setup();
        open(&chat, &mock, 4, messages(&[]));
        let rows = chat.view().pane.rows();
        assert_eq!(rows, vec![Row::Empty]);
        assert!(!rows.iter().any(|row| matches!(row, Row::Message { .. })));
    }

    #[test]
    fn failed_load_keeps_view_and_selection() {
        let (chat, mock, hooks) = setup();
        open(&chat, &mock, 1, messages(&[("user", "kept")]));
        mock.reply("GET", "/api/conversations/2/messages", Canned::Network);
        block_on(chat.open_conversation(ConversationId(2)));

        assert_eq!(chat.selected(), Some(ConversationId(2)));
        assert_eq!(contents(&chat.view()), vec![(Role::User, "kept".to_owned())]);
        assert_eq!(hooks.reports(), 1);
        assert!(hooks.alerts().is_empty());
    }

    #[test]
    fn refresh_keeps_highlight() {
        let (chat, mock, hooks) = setup();
        open(&chat, &mock, 2, messages(&[]));
        mock.reply("GET", "/api/conversations", Canned::Ok(list(&[1, 2])));
        block_on(chat.refresh_list());
        let view = chat.view();
        assert_eq!(view.conversations.len(), 2);
        assert_eq!(view.selected, Some(ConversationId(2)));

        // Selected conversation vanished from the list.
        mock.reply("GET", "/api/conversations", Canned::Ok(list(&[1])));
        block_on(chat.refresh_list());
        let now = crate::state::parse_timestamp("2024-05-01 10:00:00").unwrap();
        assert!(chat
            .view()
            .conversation_items(now)
            .iter()
            .all(|item| !item.active));

        mock.reply("GET", "/api/conversations", Canned::Network);
        block_on(chat.refresh_list());
        assert_eq!(chat.view().conversations.len(), 1);
        assert_eq!(hooks.reports(), 1);
    }

    #[test]
    fn older_list_response_is_dropped() {
        let (chat, mock, _) = setup();
        let gate = mock.gate("GET", "/api/conversations", Canned::Ok(list(&[1])));
        mock.reply("GET", "/api/conversations", Canned::Ok(list(&[1, 2, 3])));

        block_on(async {
            let old = chat.refresh_list();
            pin_mut!(old);
            assert!(poll!(old.as_mut()).is_pending());
            chat.refresh_list().await;
            gate.send(()).unwrap();
            old.await;
        });
        assert_eq!(chat.view().conversations.len(), 3);
    }

    #[test]
    fn create_refreshes_then_opens() {
        let (chat, mock, hooks) = setup();
        mock.reply(
            "POST",
            "/api/conversations",
            Canned::Ok(json!({"id": 9, "title": DEFAULT_TITLE, "updated_at": "2024-05-01 10:00:00"})),
        );
        mock.reply("GET", "/api/conversations", Canned::Ok(list(&[9])));
        mock.reply(
            "GET",
            "/api/conversations/9/messages",
            Canned::Ok(messages(&[])),
        );
        chat.set_input("draft");
        block_on(chat.create_conversation(DEFAULT_TITLE));

        let requests: Vec<String> = mock
            .calls
            .borrow()
            .iter()
            .map(|call| format!("{} {}", call.method, call.path))
            .collect();
        assert_eq!(
            requests,
            vec![
                "POST /api/conversations",
                "GET /api/conversations",
                "GET /api/conversations/9/messages"
            ]
        );
        assert_eq!(
            mock.calls.borrow()[0].body,
            Some(json!({"title": DEFAULT_TITLE}))
        );
        let view = chat.view();
        assert_eq!(chat.selected(), Some(ConversationId(9)));
        assert_eq!(view.input, "");
        assert_eq!(view.pane.rows(), vec![Row::Empty]);
        assert!(hooks.alerts().is_empty());
    }

    #[test]
    fn create_failure_is_surfaced() {
        let (chat, mock, hooks) = setup();
        mock.reply(
            "POST",
            "/api/conversations",
            Canned::Status(500, json!({"error": "disk full"})),
        );
        block_on(chat.create_conversation(DEFAULT_TITLE));
        assert_eq!(
            hooks.alerts(),
            vec!["Failed to create conversation: disk full".to_owned()]
        );
        assert_eq!(chat.selected(), None);

        mock.reply("POST", "/api/conversations", Canned::Network);
        block_on(chat.create_conversation(DEFAULT_TITLE));
        assert_eq!(
            hooks.alerts().last().map(String::as_str),
            Some("Failed to create conversation")
        );
    }

    #[test]
    fn reply_after_switching_away_stays_out_of_the_new_transcript() {
        let (chat, mock, _) = setup();
        open(&chat, &mock, 1, messages(&[]));
        let gate = mock.gate(
            "POST",
            "/api/conversations/1/messages",
            Canned::Ok(json!({"message": {"role": "assistant", "content": "for A"}})),
        );
        mock.reply(
            "GET",
            "/api/conversations/2/messages",
            Canned::Ok(messages(&[("user", "from B")])),
        );
        mock.reply("GET", "/api/conversations", Canned::Ok(list(&[1, 2])));

        block_on(async {
            chat.set_input("to A");
            let send = chat.send();
            pin_mut!(send);
            assert!(poll!(send.as_mut()).is_pending());
            chat.open_conversation(ConversationId(2)).await;
            gate.send(()).unwrap();
            assert_eq!(send.await, SendOutcome::Replied);
        });

        let view = chat.view();
        assert_eq!(contents(&view), vec![(Role::User, "from B".to_owned())]);
        assert_eq!(view.pane.pending_count(), 0);
        assert_eq!(view.conversations.len(), 2);
    }

    #[test]
    fn rename() {
        let (chat, mock, hooks) = setup();
        block_on(chat.rename_conversation(ConversationId(1), "   "));
        assert!(mock.calls.borrow().is_empty());
        assert_eq!(hooks.alerts(), vec!["Title cannot be empty".to_owned()]);

        mock.reply(
            "PUT",
            "/api/conversations/1",
            Canned::Ok(json!({"id": 1, "title": "Trip", "updated_at": "2024-05-01 10:00:00"})),
        );
        mock.reply("GET", "/api/conversations", Canned::Ok(list(&[1])));
        block_on(chat.rename_conversation(ConversationId(1), " Trip "));
        assert_eq!(mock.calls.borrow()[0].body, Some(json!({"title": "Trip"})));
        assert_eq!(mock.calls_to("GET", "/api/conversations"), 1);
    }

    #[test]
    fn config_editor_fills_defaults() {
        let (chat, mock, _) = setup();
        mock.reply("GET", "/api/config", Canned::Ok(json!({"model": "glm-4.5"})));
        block_on(chat.open_config());
        let form = chat.view().editor.unwrap();
        assert_eq!(form.model, "glm-4.5");
        assert_eq!(form.temperature, "0.7");
        assert_eq!(form.max_tokens, "2000");
        assert_eq!(form.max_history_rounds, "10");
        assert_eq!(form.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn config_editor_opens_even_if_load_fails() {
        let (chat, mock, hooks) = setup();
        mock.reply("GET", "/api/config", Canned::Network);
        block_on(chat.open_config());
        assert_eq!(chat.view().editor, Some(ConfigForm::default()));
        assert_eq!(hooks.reports(), 1);
    }

    #[test]
    fn config_save() {
        let (chat, mock, hooks) = setup();
        mock.reply("GET", "/api/config", Canned::Ok(json!({})));
        block_on(chat.open_config());

        chat.edit_config(|form| form.temperature = "abc".into());
        assert!(!block_on(chat.save_config()));
        assert_eq!(mock.calls_to("POST", "/api/config"), 0);
        assert!(chat.view().editor.is_some());

        chat.edit_config(|form| {
            form.temperature = "0.3".into();
            form.api_key = "bad".into();
        });
        mock.reply(
            "POST",
            "/api/config",
            Canned::Status(400, json!({"error": "Invalid API key"})),
        );
        assert!(!block_on(chat.save_config()));
        assert!(chat.view().editor.is_some());
        assert_eq!(
            hooks.alerts().last().map(String::as_str),
            Some("Failed to save configuration: Invalid API key")
        );

        mock.reply("POST", "/api/config", Canned::Ok(json!({"success": true})));
        assert!(block_on(chat.save_config()));
        assert_eq!(chat.view().editor, None);
        assert_eq!(
            hooks.alerts().last().map(String::as_str),
            Some("Configuration saved")
        );
        let body = mock.calls.borrow().last().unwrap().body.clone().unwrap();
        assert_eq!(body["temperature"], json!(0.3));
        assert_eq!(body["max_tokens"], json!(2000));
        assert_eq!(body["zhipu_api_key"], json!("bad"));
    }

    #[test]
    fn save_without_editor_is_a_no_op() {
        let (chat, mock, _) = setup();
        assert!(!block_on(chat.save_config()));
        assert!(mock.calls.borrow().is_empty());
    }

    #[test]
    fn validate_key() {
        let (chat, mock, hooks) = setup();
        mock.reply(
            "POST",
            "/api/config/validate",
            Canned::Ok(json!({"valid": false, "error": "API key not configured"})),
        );
        block_on(chat.validate_config());
        assert_eq!(
            hooks.alerts(),
            vec!["API key is not valid: API key not configured".to_owned()]
        );
    }
}
