use crate::app::ChatHandle;
use crate::config::ConfigForm;
use ev::MouseEvent;
use leptos::*;

const INPUT: &str = "block w-full p-2.5 text-sm text-gray-900 bg-white rounded-lg border border-gray-300 focus:ring-blue-500 focus:border-blue-500 dark:bg-gray-800 dark:border-gray-600 dark:text-white";
const BUTTON: &str = "text-white bg-gray-800 hover:bg-gray-900 focus:outline-none focus:ring-4 focus:ring-gray-300 font-medium rounded-lg text-sm px-5 py-2.5 me-2 dark:bg-gray-800 dark:hover:bg-gray-700 dark:focus:ring-gray-700";
const PRIMARY: &str = "text-white bg-blue-700 hover:bg-blue-800 focus:ring-4 focus:ring-blue-300 font-medium rounded-lg text-sm px-5 py-2.5 dark:bg-blue-600 dark:hover:bg-blue-700 focus:outline-none dark:focus:ring-blue-800";

fn read(handle: ChatHandle, get: fn(&ConfigForm) -> String) -> impl Fn() -> String + Copy {
    move || {
        handle
            .state
            .with(|view| view.editor.as_ref().map(get).unwrap_or_default())
    }
}

fn write(handle: ChatHandle, set: fn(&mut ConfigForm, String)) -> impl Fn(ev::Event) + Copy {
    move |ev| {
        let v = event_target_value(&ev);
        handle.with(|chat| chat.edit_config(|form| set(form, v)));
    }
}

#[component]
fn Field(
    handle: ChatHandle,
    label: &'static str,
    get: fn(&ConfigForm) -> String,
    set: fn(&mut ConfigForm, String),
    #[prop(default = "text")] kind: &'static str,
    #[prop(optional)] step: Option<&'static str>,
) -> impl IntoView {
    view! {
        <label class="block mb-4 text-left text-sm text-gray-900 dark:text-white">
            {label}
            <input
                type=kind
                step=step
                class=INPUT
                prop:value=read(handle, get)
                on:input=write(handle, set)
            />
        </label>
    }
}

#[component]
pub fn Settings(handle: ChatHandle) -> impl IntoView {
    // Rebuilt on open/close only, so inputs keep focus while typing.
    let open = create_memo(move |_| handle.state.with(|view| view.editor.is_some()));
    let close = move |_| handle.with(|chat| chat.close_config());
    let save = move |_| {
        handle.spawn(|chat| async move {
            chat.save_config().await;
        });
    };
    let validate = move |_| {
        handle.spawn(|chat| async move { chat.validate_config().await });
    };
    let stored_key = move || {
        handle.state.with(|view| {
            view.editor
                .as_ref()
                .is_some_and(ConfigForm::has_stored_key)
        })
    };

    move || {
        open.get().then(|| {
            let (options, current) = handle.state.with(|view| {
                view.editor
                    .as_ref()
                    .map(|form| (form.model_options(), form.model.clone()))
                    .unwrap_or_default()
            });
            view! {
                <div
                    class="fixed inset-0 z-50 flex items-center justify-center bg-black/50"
                    on:click=close
                >
                    <div
                        class="w-full max-w-lg p-6 bg-white rounded-lg shadow dark:bg-gray-800"
                        on:click=|ev: MouseEvent| ev.stop_propagation()
                    >
                        <h5 class="mb-4 text-base font-semibold text-gray-500 uppercase dark:text-gray-400">
                            Settings
                        </h5>
                        <Field
                            handle
                            label="API key"
                            kind="password"
                            get=|form| form.api_key.clone()
                            set=|form, v| form.api_key = v
                        />
                        <Show when=stored_key>
                            <p class="-mt-3 mb-4 text-left text-xs text-gray-500 dark:text-gray-400">
                                A key is stored on the server. Leave as is to keep it.
                            </p>
                        </Show>
                        <label class="block mb-4 text-left text-sm text-gray-900 dark:text-white">
                            Model
                            <select
                                class=INPUT
                                on:change=write(handle, |form, v| form.model = v)
                            >
                                {options
                                    .into_iter()
                                    .map(|option| {
                                        let selected = option == current;
                                        view! {
                                            <option value=option.clone() selected=selected>
                                                {option}
                                            </option>
                                        }
                                    })
                                    .collect::<Vec<_>>()}
                            </select>
                        </label>
                        <Field
                            handle
                            label="Temperature"
                            kind="number"
                            step="0.1"
                            get=|form| form.temperature.clone()
                            set=|form, v| form.temperature = v
                        />
                        <Field
                            handle
                            label="Max tokens"
                            kind="number"
                            get=|form| form.max_tokens.clone()
                            set=|form, v| form.max_tokens = v
                        />
                        <Field
                            handle
                            label="Max history rounds"
                            kind="number"
                            get=|form| form.max_history_rounds.clone()
                            set=|form, v| form.max_history_rounds = v
                        />
                        <label class="block mb-4 text-left text-sm text-gray-900 dark:text-white">
                            System prompt
                            <textarea
                                rows="4"
                                class=INPUT
                                prop:value=read(handle, |form| form.system_prompt.clone())
                                on:input=write(handle, |form, v| form.system_prompt = v)
                            ></textarea>
                        </label>
                        <div class="flex flex-row justify-end">
                            <button type="button" class=BUTTON on:click=validate>
                                Test key
                            </button>
                            <button type="button" class=BUTTON on:click=close>
                                Cancel
                            </button>
                            <button type="button" class=PRIMARY on:click=save>
                                Save
                            </button>
                        </div>
                    </div>
                </div>
            }
        })
    }
}
