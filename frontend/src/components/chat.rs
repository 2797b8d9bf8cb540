use common::req::{ChatRole, ChatTurn, GraphEntry};
use log::warn;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::request;

#[derive(Properties, PartialEq)]
pub struct Props {
    pub bin_id: String,
    /// full history of the bin, handed to the assistant as context
    pub data: Vec<GraphEntry>,
}

/// Floating assistant. The conversation only lives while the dialog is open.
#[function_component(Chat)]
pub fn chat(props: &Props) -> Html {
    let open = use_state(|| false);
    let turns = use_state(Vec::<ChatTurn>::new);
    let input = use_state(String::new);
    let pending = use_state(|| false);
    let error = use_state(|| None::<String>);
    // bumped on close so replies to a discarded conversation are ignored
    let session = use_mut_ref(|| 0u64);

    let on_open = {
        let open = open.clone();
        Callback::from(move |_: MouseEvent| open.set(true))
    };

    let on_close = {
        let open = open.clone();
        let turns = turns.clone();
        let input = input.clone();
        let pending = pending.clone();
        let error = error.clone();
        let session = session.clone();
        Callback::from(move |_: MouseEvent| {
            *session.borrow_mut() += 1;
            open.set(false);
            turns.set(vec![]);
            input.set(String::new());
            pending.set(false);
            error.set(None);
        })
    };

    let on_input = {
        let input = input.clone();
        Callback::from(move |e: InputEvent| {
            let field: HtmlInputElement = e.target_unchecked_into();
            input.set(field.value());
        })
    };

    let on_send = {
        let turns = turns.clone();
        let input = input.clone();
        let pending = pending.clone();
        let error = error.clone();
        let session = session.clone();
        let data = props.data.clone();
        let bin_id = props.bin_id.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            let message = input.trim().to_owned();
            if message.is_empty() || *pending {
                return;
            }

            let mut history = (*turns).clone();
            history.push(ChatTurn::user(message.clone()));
            turns.set(history.clone());
            input.set(String::new());
            pending.set(true);
            error.set(None);

            let started = *session.borrow();
            let turns = turns.clone();
            let pending = pending.clone();
            let error = error.clone();
            let session = session.clone();
            let data = data.clone();
            let bin_id = bin_id.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let reply = request::ask_assistant(bin_id, message, data, history.clone()).await;
                if *session.borrow() != started {
                    return;
                }
                match reply {
                    Ok(text) => {
                        history.push(ChatTurn::assistant(text));
                        turns.set(history);
                    }
                    Err(e) => {
                        warn!("assistant request failed: {e}");
                        error.set(Some(e.to_string()));
                    }
                }
                pending.set(false);
            });
        })
    };

    if !*open {
        return html! {
            <button class="btn btn-primary chat-open" onclick={on_open} title="Ask about this bin">
                {"💬"}
            </button>
        };
    }

    html! {
        <div class="chat-dialog panel panel-primary">
            <div class="panel-heading">
                <button type="button" class="close" onclick={on_close}>{"×"}</button>
                <h3 class="panel-title">{"Bin assistant"}</h3>
            </div>
            <div class="panel-body chat-log">
                if turns.is_empty() {
                    <p class="text-muted">{"Ask about fill levels, sensor readings or when the bin needs emptying."}</p>
                }
                { for turns.iter().map(chat_bubble) }
                if *pending {
                    <p class="text-muted">{"thinking..."}</p>
                }
                if let Some(e) = &*error {
                    <div class="alert alert-danger">{format!("The assistant is unavailable: {e}")}</div>
                }
            </div>
            <form class="panel-footer input-group" onsubmit={on_send}>
                <input
                    class="form-control"
                    type="text"
                    placeholder="Type a question..."
                    value={(*input).clone()}
                    oninput={on_input}
                    disabled={*pending}
                />
                <span class="input-group-btn">
                    <button class="btn btn-primary" type="submit" disabled={*pending}>{"Send"}</button>
                </span>
            </form>
        </div>
    }
}

fn chat_bubble(turn: &ChatTurn) -> Html {
    let class = match turn.role {
        ChatRole::User => "chat-turn chat-user",
        ChatRole::Assistant => "chat-turn chat-assistant",
    };
    html! {
        <div {class}>{turn.text.clone()}</div>
    }
}
