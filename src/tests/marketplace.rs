use super::written_events;
use crate::{
    auction::{amount_from_naira, Amount, ItemIdRef},
    event::{Event, ItemBid, MarketplaceEvent},
    event_log,
    marketplace::{BidRecord, FlashSaleTimer, Item, ItemFilters, PaymentRef, Profile},
    service::countdown::DisplayBoard,
    service::marketplace::{MarketplaceClient, MarketplaceReceiver, Watchlist},
    service::LoopService,
};
use anyhow::{bail, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Backend double: one mutable item, everything else unused.
struct FakeMarketplace(Mutex<Item>);

impl FakeMarketplace {
    fn new_shared(item: Item) -> Arc<Self> {
        Arc::new(Self(Mutex::new(item)))
    }

    fn set_highest_bid(&self, naira: f64) {
        self.0.lock().current_highest_bid = Some(naira);
    }

    fn set_end_time(&self, end: DateTime<Utc>) {
        self.0.lock().auction_end_time = Some(end);
    }
}

impl MarketplaceClient for FakeMarketplace {
    fn fetch_item(&self, _item_id: ItemIdRef) -> Result<Item> {
        Ok(self.0.lock().clone())
    }

    fn fetch_items(&self, _filters: &ItemFilters) -> Result<Vec<Item>> {
        bail!("not used by this test")
    }

    fn fetch_bids(&self, _item_id: ItemIdRef) -> Result<Vec<BidRecord>> {
        bail!("not used by this test")
    }

    fn place_bid(&self, _item_id: ItemIdRef, _amount: Amount, _payment: &PaymentRef) -> Result<()> {
        bail!("not used by this test")
    }

    fn buy_now(&self, _item_id: ItemIdRef, _payment: &PaymentRef) -> Result<()> {
        bail!("not used by this test")
    }

    fn my_listings(&self) -> Result<Vec<Item>> {
        bail!("not used by this test")
    }

    fn delete_listing(&self, _item_id: ItemIdRef) -> Result<()> {
        bail!("not used by this test")
    }

    fn fetch_profile(&self) -> Result<Profile> {
        bail!("not used by this test")
    }

    fn flash_sale_timer(&self) -> Result<FlashSaleTimer> {
        bail!("not used by this test")
    }
}

fn auction_item(end: DateTime<Utc>) -> Item {
    Item {
        id: "7".to_owned(),
        title: "hall fridge".to_owned(),
        description: None,
        starting_price: 100.0,
        current_highest_bid: None,
        is_auction: true,
        auction_end_time: Some(end),
        category: None,
        university: None,
        seller_username: None,
        image_url: None,
        created_at: None,
    }
}

#[test]
fn receiver_reports_listing_floor_raise_and_close() -> Result<()> {
    let (event_writer, event_reader) = event_log::new_in_memory_shared();
    let watchlist = Watchlist::new_shared();
    let board = DisplayBoard::new_shared();

    let backend = FakeMarketplace::new_shared(auction_item(Utc::now() + ChronoDuration::hours(1)));
    watchlist.watch("7");

    let mut receiver = MarketplaceReceiver::new(
        backend.clone(),
        watchlist.clone(),
        event_writer,
        board,
        Duration::from_secs(0),
    );

    // first sighting
    receiver.run_iteration()?;
    // a confirmed bid raises the floor
    backend.set_highest_bid(150.0);
    receiver.run_iteration()?;
    // unchanged state produces no new events
    receiver.run_iteration()?;
    // deadline passes
    backend.set_end_time(Utc::now() - ChronoDuration::seconds(1));
    receiver.run_iteration()?;

    let events = written_events(&event_reader)?;
    assert_eq!(events.len(), 3);
    assert!(matches!(
        &events[0],
        Event::Marketplace(MarketplaceEvent::Listed(snapshot))
            if snapshot.item == "7" && snapshot.floor == amount_from_naira(100.0)
    ));
    assert_eq!(
        events[1],
        Event::Marketplace(MarketplaceEvent::BidConfirmed(ItemBid {
            item: "7".to_owned(),
            amount: amount_from_naira(150.0),
        }))
    );
    assert_eq!(
        events[2],
        Event::Marketplace(MarketplaceEvent::Closed("7".to_owned()))
    );

    // a closed auction is no longer watched
    assert!(watchlist.snapshot().is_empty());

    Ok(())
}

#[test]
fn receiver_ignores_non_auction_items() -> Result<()> {
    let (event_writer, event_reader) = event_log::new_in_memory_shared();
    let watchlist = Watchlist::new_shared();

    let mut item = auction_item(Utc::now() + ChronoDuration::hours(1));
    item.is_auction = false;
    let backend = FakeMarketplace::new_shared(item);
    watchlist.watch("7");

    let mut receiver = MarketplaceReceiver::new(
        backend,
        watchlist,
        event_writer,
        DisplayBoard::new_shared(),
        Duration::from_secs(0),
    );
    receiver.run_iteration()?;

    assert_eq!(written_events(&event_reader)?, vec![]);

    Ok(())
}

#[test]
fn receiver_starts_a_ticker_for_each_listed_auction() -> Result<()> {
    let (event_writer, _event_reader) = event_log::new_in_memory_shared();
    let watchlist = Watchlist::new_shared();
    let board = DisplayBoard::new_shared();

    let backend = FakeMarketplace::new_shared(auction_item(Utc::now() + ChronoDuration::hours(1)));
    watchlist.watch("7");

    let mut receiver = MarketplaceReceiver::new(
        backend,
        watchlist,
        event_writer,
        board.clone(),
        Duration::from_secs(0),
    );
    receiver.run_iteration()?;

    // the ticker renders its first label synchronously on spawn; give
    // the thread a moment to get there
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while board.get("7").is_none() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    let label = board.get("7").expect("ticker rendered");
    assert!(label.ends_with('s'), "unexpected label: {label}");

    Ok(())
}
