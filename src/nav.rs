use crate::app::ChatHandle;
use crate::controller::DEFAULT_TITLE;
use chrono::Local;
use ev::MouseEvent;
use leptos::logging::warn;
use leptos::*;

const ITEM: &str = "flex flex-col p-2 text-gray-900 rounded-lg dark:text-white hover:bg-gray-100 dark:hover:bg-gray-700 group";
const ACTIVE_ITEM: &str = "flex flex-col p-2 text-gray-900 rounded-lg dark:text-white bg-gray-100 dark:bg-gray-700 group";
const BUTTON: &str = "text-white bg-gray-800 hover:bg-gray-900 focus:outline-none focus:ring-4 focus:ring-gray-300 font-medium rounded-lg text-sm px-5 py-2.5 me-2 mb-2 dark:bg-gray-800 dark:hover:bg-gray-700 dark:focus:ring-gray-700 dark:border-gray-700";

#[component]
pub fn Nav(handle: ChatHandle) -> impl IntoView {
    let (show, set_show) = create_signal(true);
    let items = create_memo(move |_| {
        let now = Local::now().naive_local();
        handle.state.with(|view| view.conversation_items(now))
    });
    let new_conversation = move |_| {
        handle.spawn(|chat| async move { chat.create_conversation(DEFAULT_TITLE).await });
    };
    let open_settings = move |_| {
        handle.spawn(|chat| async move { chat.open_config().await });
    };
    view! {
        {move || {
            if show.get() {
                view! { <div /> }
            } else {
                view! {
                    <div
                        class="lg:hidden text-gray-500 dark:text-gray-400 p-5 absolute top-0 left-0"
                        on:click=move |_| {
                            set_show
                                .update(|s| {
                                    *s = !*s;
                                })
                        }
                    >
                        <svg viewBox="0 0 10 8" width="20">
                            <path
                                d="M1 1h8M1 4h 8M1 7h8"
                                stroke="currentColor"
                                fill="currentColor"
                                stroke-width="2"
                                stroke-linecap="round"
                            />
                        </svg>
                    </div>
                }
            }
        }}
        <div
            class="lg:w-1/5 w-full lg:flex border-e-2 dark:border-gray-800 min-h-dvh max-h-dvh overflow-y-auto dark:text-white"
            class:hidden=move || !show.get()
        >
            <div class="text-center w-full flex flex-col vertical-align">
                <div
                    class="lg:hidden text-gray-500 dark:text-gray-400 p-5"
                    on:click=move |_| {
                        set_show
                            .update(|s| {
                                *s = !*s;
                            })
                    }
                >
                    <svg viewBox="0 0 10 10" width="20">
                        <path
                            d="M1 1L9 9M1 9L9 1"
                            stroke="currentColor"
                            fill="currentColor"
                            stroke-width="2"
                            stroke-linecap="round"
                        />
                    </svg>
                </div>
                <div class="flex flex-row m-4">
                    <h5 class="text-base py-2.5 font-semibold text-gray-500 uppercase dark:text-gray-400 w-full">
                        Chat
                    </h5>
                </div>
                <div class="py-4 overflow-y-auto grow">
                    <ul class="space-y-2 font-medium">
                        {move || {
                            items
                                .get()
                                .into_iter()
                                .map(|item| {
                                    let id = item.id;
                                    let title = item.title.clone();
                                    let class = if item.active { ACTIVE_ITEM } else { ITEM };
                                    let onclick = move |ev: MouseEvent| {
                                        ev.prevent_default();
                                        // Only useful on mobile
                                        set_show.set(false);
                                        handle
                                            .spawn(move |chat| async move {
                                                chat.open_conversation(id).await
                                            });
                                    };
                                    let rename = move |ev: MouseEvent| {
                                        ev.stop_propagation();
                                        let answer = window()
                                            .prompt_with_message_and_default("Rename conversation", &title);
                                        match answer {
                                            Ok(Some(title)) => {
                                                handle
                                                    .spawn(move |chat| async move {
                                                        chat.rename_conversation(id, &title).await
                                                    });
                                            }
                                            Ok(None) => {}
                                            Err(err) => warn!("Prompt failed {err:?}"),
                                        }
                                    };
                                    view! {
                                        <li on:click=onclick>
                                            <a href="#" class=class>
                                                <div class="flex flex-row items-center">
                                                    <span class="ms-3 grow text-left truncate">
                                                        {item.title}
                                                    </span>
                                                    <button
                                                        type="button"
                                                        class="invisible group-hover:visible text-xs text-gray-500 dark:text-gray-400 px-2"
                                                        on:click=rename
                                                    >
                                                        Rename
                                                    </button>
                                                </div>
                                                <span class="ms-3 text-left text-xs text-gray-500 dark:text-gray-400">
                                                    {item.time}
                                                </span>
                                            </a>
                                        </li>
                                    }
                                })
                                .collect::<Vec<_>>()
                        }}
                    </ul>
                </div>
                <div>
                    <button type="button" class=BUTTON on:click=new_conversation>
                        + New conversation
                    </button>
                    <button type="button" class=BUTTON on:click=open_settings>
                        Settings
                    </button>
                </div>
            </div>
        </div>
    }
}
