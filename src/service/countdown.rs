//! Per-card countdown tickers
//!
//! One ticker per rendered auction card, each with its own handle so
//! the owner can cancel it when the card goes away. Every tick
//! recomputes from the absolute end time; a ticker that overslept (or
//! a suspended process) renders the right remainder on the next tick
//! instead of drifting.
use crate::auction::{format_remaining, AuctionPhase, AuctionWindow, ItemId, ItemIdRef};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

pub const TICK: Duration = Duration::from_secs(1);

/// Handle to one running ticker.
///
/// Cancelling (or dropping) stops the ticker and joins its thread, so
/// a removed card cannot leak a live interval. A ticker whose window
/// ends stops itself after rendering the terminal label once.
pub struct CountdownHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CountdownHandle {
    pub fn cancel(mut self) {
        self.stop_and_join();
    }

    pub fn is_finished(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(true)
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Start a ticker that renders `window`'s remaining time through
/// `render` once per second until the window ends or the handle is
/// cancelled.
///
/// The render callback is injected so the timing logic stays free of
/// any display concern.
pub fn spawn_countdown<F>(window: AuctionWindow, mut render: F) -> CountdownHandle
where
    F: FnMut(&str) + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));

    let thread = thread::spawn({
        let stop = stop.clone();
        move || loop {
            let now = Utc::now();
            render(&format_remaining(window, now));

            if window.phase(now) == AuctionPhase::Ended {
                break;
            }
            thread::park_timeout(TICK);
            if stop.load(Ordering::SeqCst) {
                break;
            }
        }
    });

    CountdownHandle {
        stop,
        thread: Some(thread),
    }
}

/// Latest countdown label per item, shared between the tickers that
/// write it and the ui that reads it.
#[derive(Default)]
pub struct DisplayBoard(Mutex<BTreeMap<ItemId, String>>);

pub type SharedDisplayBoard = Arc<DisplayBoard>;

impl DisplayBoard {
    pub fn new_shared() -> SharedDisplayBoard {
        Arc::new(Self::default())
    }

    pub fn set(&self, item_id: ItemIdRef, label: &str) {
        self.0.lock().insert(item_id.to_owned(), label.to_owned());
    }

    pub fn get(&self, item_id: ItemIdRef) -> Option<String> {
        self.0.lock().get(item_id).cloned()
    }

    pub fn remove(&self, item_id: ItemIdRef) {
        self.0.lock().remove(item_id);
    }
}
