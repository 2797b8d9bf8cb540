use std::{
    cell::{Ref, RefCell},
    future::Future,
    rc::Rc,
};

use common::seq::Snapshot;
use log::debug;
use yew::prelude::*;

pub type Fetched<T> = Result<T, String>;

/// Latest fetched state of a view. Responses that arrive after a newer
/// request has already been applied are thrown away.
pub struct FetchHandle<T> {
    snapshot: Rc<RefCell<Snapshot<Fetched<T>>>>,
    redraw: UseForceUpdateHandle,
}

impl<T> Clone for FetchHandle<T> {
    fn clone(&self) -> Self {
        Self {
            snapshot: self.snapshot.clone(),
            redraw: self.redraw.clone(),
        }
    }
}

impl<T: 'static> FetchHandle<T> {
    pub fn run<F>(&self, fetch: F)
    where
        F: Future<Output = anyhow::Result<T>> + 'static,
    {
        let ticket = self.snapshot.borrow_mut().begin();
        let handle = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = fetch.await.map_err(|e| e.to_string());
            if handle.snapshot.borrow_mut().apply(ticket, result) {
                handle.redraw.force_update();
            } else {
                debug!("dropped stale response {ticket:?}");
            }
        });
    }

    pub fn snapshot(&self) -> Ref<'_, Snapshot<Fetched<T>>> {
        self.snapshot.borrow()
    }
}

#[hook]
pub fn use_fetch<T: 'static>() -> FetchHandle<T> {
    let snapshot = use_mut_ref(Snapshot::default);
    let redraw = use_force_update();
    FetchHandle { snapshot, redraw }
}
