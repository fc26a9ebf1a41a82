use crate::state::Role;
use leptos::IntoView;
use leptos::*;

/// One transcript bubble. `html` is already escaped or rendered markdown.
#[component]
pub fn Message(role: Role, html: String) -> impl IntoView {
    let is_me = role == Role::User;
    view! {
        <div class="flex items-start m-5 gap-2.5" class:flex-row-reverse=is_me>
            <div class="flex flex-col gap-1 max-w-[90%]">
                <div class="flex items-center space-x-2 rtl:space-x-reverse">
                    <span class="text-sm font-semibold text-gray-900 dark:text-white">
                        {role.label()}
                    </span>
                </div>
                <div class="flex flex-col leading-1.5 p-4 border-gray-200 bg-gray-100 rounded-e-xl rounded-es-xl dark:bg-gray-700">
                    <div
                        class="text-sm font-normal text-gray-900 dark:text-white"
                        class:whitespace-pre-wrap=is_me
                        inner_html=html
                    />
                </div>
            </div>
        </div>
    }
}
