use crate::api::{Api, HttpTransport};
use crate::controller::{ChatController, Hooks};
use crate::conversation::Conversation as Conv;
use crate::nav::Nav;
use crate::settings::Settings;
use crate::view::ChatView;
use leptos::logging::{log, warn};
use leptos::*;
use std::future::Future;
use std::rc::Rc;

/// Pushes controller output into the reactive graph.
#[derive(Clone, Copy)]
pub struct SignalHooks {
    state: RwSignal<ChatView>,
}

impl Hooks for SignalHooks {
    fn render(&self, view: &ChatView) {
        self.state.set(view.clone());
    }

    fn alert(&self, message: &str) {
        if let Err(err) = window().alert_with_message(message) {
            warn!("Could not show alert {err:?}");
        }
    }
}

pub type Chat = ChatController<HttpTransport, SignalHooks>;

/// What every component gets: the controller and the view it renders into.
#[derive(Clone, Copy)]
pub struct ChatHandle {
    chat: StoredValue<Rc<Chat>>,
    pub state: RwSignal<ChatView>,
}

impl ChatHandle {
    pub fn spawn<F, Fut>(&self, task: F)
    where
        F: FnOnce(Rc<Chat>) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        spawn_local(task(self.chat.get_value()));
    }

    pub fn with<R>(&self, f: impl FnOnce(&Chat) -> R) -> R {
        self.chat.with_value(|chat| f(chat))
    }
}

/// `?api=http://host:port` points the client at another server; otherwise
/// the page's own origin serves the API.
fn api_base() -> String {
    let location = window().location();
    if let Ok(href) = location.href() {
        match url::Url::parse(&href) {
            Ok(url) => {
                for (key, value) in url.query_pairs() {
                    match &key[..] {
                        "api" => return value.into_owned(),
                        string => log!("Unexpected param {string}: {value}"),
                    }
                }
            }
            Err(err) => warn!("Could not parse page url {href}: {err}"),
        }
    }
    location.origin().unwrap_or_default()
}

#[component]
pub fn App() -> impl IntoView {
    let state = create_rw_signal(ChatView::default());
    let base = api_base();
    log!("Using api at {base}");
    let chat = ChatController::new(Api::new(HttpTransport::new(&base)), SignalHooks { state });
    let handle = ChatHandle {
        chat: store_value(Rc::new(chat)),
        state,
    };
    handle.spawn(|chat| async move { chat.refresh_list().await });

    view! {
        <div class="flex flex-row">
            <Nav handle />
            <Conv handle />
            <Settings handle />
        </div>
    }
}
