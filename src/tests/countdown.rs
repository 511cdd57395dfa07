use crate::{
    auction::{AuctionWindow, ENDED_LABEL},
    service::countdown::{spawn_countdown, DisplayBoard},
};
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

fn capture() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = seen.clone();
        move |label: &str| seen.lock().push(label.to_owned())
    };
    (seen, sink)
}

#[test]
fn ended_window_renders_the_terminal_label_once_and_stops() {
    let (seen, sink) = capture();

    let handle = spawn_countdown(AuctionWindow::already_ended(), sink);
    handle.cancel();

    assert_eq!(*seen.lock(), vec![ENDED_LABEL.to_owned()]);
}

#[test]
fn past_deadline_window_is_terminal_immediately() {
    let (seen, sink) = capture();

    let window = AuctionWindow::until(Utc::now() - Duration::hours(1));
    spawn_countdown(window, sink).cancel();

    assert_eq!(*seen.lock(), vec![ENDED_LABEL.to_owned()]);
}

#[test]
fn cancelling_an_open_ticker_stops_it_mid_window() {
    let (seen, sink) = capture();

    let window = AuctionWindow::until(Utc::now() + Duration::hours(1));
    let handle = spawn_countdown(window, sink);
    handle.cancel();

    // rendered at least once before the cancel landed, never terminal
    assert!(!seen.lock().is_empty());
    assert!(seen.lock().iter().all(|label| label != ENDED_LABEL));

    // cancel() joined the ticker thread, so nothing else arrives
    let count = seen.lock().len();
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert_eq!(seen.lock().len(), count);
}

#[test]
fn board_keeps_the_latest_label_per_item() {
    let board = DisplayBoard::new_shared();

    board.set("7", "1h 1m 1s");
    board.set("7", "1h 1m 0s");
    board.set("9", ENDED_LABEL);

    assert_eq!(board.get("7").as_deref(), Some("1h 1m 0s"));
    assert_eq!(board.get("9").as_deref(), Some(ENDED_LABEL));
    assert_eq!(board.get("404"), None);

    board.remove("7");
    assert_eq!(board.get("7"), None);
}
