mod api;
mod app;
mod config;
mod controller;
mod conversation;
mod loading;
mod message;
mod nav;
mod settings;
mod state;
mod view;

use app::*;
use leptos::*;

fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    mount_to_body(|| {
        view! { <App /> }
    })
}
