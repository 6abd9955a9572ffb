//! Cross-tab transport over the browser BroadcastChannel API.

use std::cell::RefCell;
use std::rc::Rc;

use scene_editor::sync::{SyncError, SyncTransport};
use shared::SyncMessage;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{BroadcastChannel, MessageEvent};

/// BroadcastChannel never delivers a tab's own posts back to it
pub struct BroadcastTransport {
    channel: BroadcastChannel,
    inbox: Rc<RefCell<Vec<String>>>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
}

impl BroadcastTransport {
    pub fn open(name: &str) -> Result<Self, JsValue> {
        let channel = BroadcastChannel::new(name)?;
        let inbox = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&inbox);
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            match event.data().as_string() {
                Some(text) => sink.borrow_mut().push(text),
                None => tracing::warn!("ignoring non-text sync message"),
            }
        });
        channel.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        Ok(Self {
            channel,
            inbox,
            _on_message: on_message,
        })
    }
}

impl SyncTransport for BroadcastTransport {
    fn post(&self, message: &SyncMessage) -> Result<(), SyncError> {
        let text = serde_json::to_string(message)?;
        self.channel
            .post_message(&JsValue::from_str(&text))
            .map_err(|e| SyncError::Transport(format!("{e:?}")))
    }

    fn drain(&mut self) -> Vec<SyncMessage> {
        self.inbox
            .borrow_mut()
            .drain(..)
            .filter_map(|text| match serde_json::from_str(&text) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::warn!("dropping malformed sync message: {e}");
                    None
                }
            })
            .collect()
    }

    fn close(&mut self) {
        self.channel.set_onmessage(None);
        self.channel.close();
    }
}
