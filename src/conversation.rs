use crate::app::ChatHandle;
use crate::loading::Loading;
use crate::message::Message;
use crate::view::Row;
use leptos::ev::KeyboardEvent;
use leptos::leptos_dom::ev::SubmitEvent;
use leptos::*;

#[component]
pub fn Conversation(handle: ChatHandle) -> impl IntoView {
    // Typing changes the view too; only a different pane re-renders bodies.
    let pane = create_memo(move |_| handle.state.with(|view| view.pane.clone()));
    let message = move || handle.state.with(|view| view.input.clone());
    let sending = move || handle.state.with(|view| view.is_sending());
    let has_selection = move || handle.state.with(|view| view.selected.is_some());

    let update_message = move |ev| {
        let v = event_target_value(&ev);
        handle.with(|chat| chat.set_input(v));
    };
    let send = move || {
        handle.spawn(|chat| async move {
            chat.send().await;
        });
    };
    let send_message = move |ev: SubmitEvent| {
        ev.prevent_default();
        send();
    };
    // Enter sends, Shift+Enter keeps the newline.
    let on_keydown = move |ev: KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="h-dvh max-h-dvh grow flex flex-col scrollbar lg:w-4/5 w-screen max-w-screen">
            <main class="grow flex flex-col-reverse overflow-auto max-h-screen">
                {move || {
                    pane.with(|pane| pane.rows())
                        .into_iter()
                        .rev()
                        .map(|row| match row {
                            Row::Empty => {
                                view! {
                                    <div class="m-auto text-gray-500 dark:text-gray-400">
                                        {move || {
                                            if has_selection() {
                                                "Start the conversation"
                                            } else {
                                                "Select or create a conversation"
                                            }
                                        }}
                                    </div>
                                }
                                    .into_view()
                            }
                            Row::Message { role, html } => view! { <Message role html /> }.into_view(),
                            Row::Thinking(_) => view! { <Loading /> }.into_view(),
                        })
                        .collect::<Vec<_>>()
                }}
            </main>
            <form class="w-full" on:submit=send_message>
                <label for="chat" class="sr-only">
                    Your message
                </label>
                <div class="flex items-center px-3 py-2 bg-gray-50 dark:bg-gray-700">
                    <textarea
                        id="chat"
                        rows="1"
                        class="block mx-4 p-2.5 w-full text-sm text-gray-900 bg-white rounded-lg border border-gray-300 focus:ring-blue-500 focus:border-blue-500 dark:bg-gray-800 dark:border-gray-600 dark:placeholder-gray-400 dark:text-white dark:focus:ring-blue-500 dark:focus:border-blue-500 resize-none"
                        placeholder="Your message..."
                        on:input=update_message
                        on:keydown=on_keydown
                        prop:value=message
                    ></textarea>
                    <button
                        type="submit"
                        class="inline-flex justify-center p-2 text-blue-600 rounded-full cursor-pointer hover:bg-blue-100 dark:text-blue-500 dark:hover:bg-gray-600"
                        class:animate-pulse=sending
                    >
                        <svg
                            class="w-5 h-5 rotate-90 rtl:-rotate-90"
                            aria-hidden="true"
                            xmlns="http://www.w3.org/2000/svg"
                            fill="currentColor"
                            viewBox="0 0 18 20"
                        >
                            <path d="m17.914 18.594-8-18a1 1 0 0 0-1.828 0l-8 18a1 1 0 0 0 1.157 1.376L8 18.281V9a1 1 0 0 1 2 0v9.281l6.758 1.689a1 1 0 0 0 1.156-1.376Z" />
                        </svg>
                        <span class="sr-only">Send message</span>
                    </button>
                </div>
            </form>
        </div>
    }
}
