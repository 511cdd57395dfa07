//! Marketplace backend services
//!
//! The sender follows the log and pushes accepted bids out to the
//! backend; the receiver polls the watched items and turns what the
//! backend says into `Marketplace` events for everyone else.
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use crate::{
    auction::{Amount, AuctionPhase, ItemId, ItemIdRef},
    event::{AuctionSnapshot, BiddingEvent, Event, ItemBid, MarketplaceEvent},
    event_log,
    marketplace::{BidRecord, FlashSaleTimer, Item, ItemFilters, PaymentRef, Profile},
    service::countdown::{spawn_countdown, CountdownHandle, SharedDisplayBoard},
    service::{LogFollowerService, LoopService, ServiceId},
};
use anyhow::Result;
use chrono::Utc;
use tracing::{debug, warn};

mod http;
pub use self::http::*;

pub trait MarketplaceClient: Send + Sync {
    fn fetch_item(&self, item_id: ItemIdRef) -> Result<Item>;
    fn fetch_items(&self, filters: &ItemFilters) -> Result<Vec<Item>>;
    fn fetch_bids(&self, item_id: ItemIdRef) -> Result<Vec<BidRecord>>;
    fn place_bid(&self, item_id: ItemIdRef, amount: Amount, payment: &PaymentRef) -> Result<()>;
    fn buy_now(&self, item_id: ItemIdRef, payment: &PaymentRef) -> Result<()>;
    fn my_listings(&self) -> Result<Vec<Item>>;
    fn delete_listing(&self, item_id: ItemIdRef) -> Result<()>;
    fn fetch_profile(&self) -> Result<Profile>;
    fn flash_sale_timer(&self) -> Result<FlashSaleTimer>;
}

pub type SharedMarketplaceClient = Arc<dyn MarketplaceClient + 'static>;

/// The set of items the receiver keeps an eye on. The ui adds to it
/// whenever a card is rendered or a bid comes in.
#[derive(Default)]
pub struct Watchlist(parking_lot::Mutex<BTreeSet<ItemId>>);

pub type SharedWatchlist = Arc<Watchlist>;

impl Watchlist {
    pub fn new_shared() -> SharedWatchlist {
        Arc::new(Self::default())
    }

    pub fn watch(&self, item_id: ItemIdRef) {
        self.0.lock().insert(item_id.to_owned());
    }

    pub fn unwatch(&self, item_id: ItemIdRef) {
        self.0.lock().remove(item_id);
    }

    pub fn snapshot(&self) -> Vec<ItemId> {
        self.0.lock().iter().cloned().collect()
    }
}

pub struct MarketplaceSender {
    client: SharedMarketplaceClient,
}

impl MarketplaceSender {
    pub fn new(client: SharedMarketplaceClient) -> Self {
        Self { client }
    }
}

impl LogFollowerService for MarketplaceSender {
    fn service_id(&self) -> ServiceId {
        "marketplace-sender".to_owned()
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Bidding(BiddingEvent::Accepted(item_bid)) => {
                debug!(item = %item_bid.item, amount = item_bid.amount, "sending bid");
                let payment = PaymentRef::for_item(&item_bid.item, Utc::now());
                // Note: we rely on idempotency of this call to the server here
                self.client
                    .place_bid(&item_bid.item, item_bid.amount, &payment)
            }
            _ => Ok(()),
        }
    }
}

pub struct MarketplaceReceiver {
    client: SharedMarketplaceClient,
    watchlist: SharedWatchlist,
    event_writer: event_log::SharedWriter,
    board: SharedDisplayBoard,
    poll_interval: Duration,

    floors: BTreeMap<ItemId, Amount>,
    closed: BTreeSet<ItemId>,
    tickers: BTreeMap<ItemId, CountdownHandle>,
}

impl MarketplaceReceiver {
    pub fn new(
        client: SharedMarketplaceClient,
        watchlist: SharedWatchlist,
        event_writer: event_log::SharedWriter,
        board: SharedDisplayBoard,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            watchlist,
            event_writer,
            board,
            poll_interval,
            floors: BTreeMap::new(),
            closed: BTreeSet::new(),
            tickers: BTreeMap::new(),
        }
    }

    fn poll_item(&mut self, item_id: &ItemId) -> Result<()> {
        let item = match self.client.fetch_item(item_id) {
            Ok(item) => item,
            // a flaky backend is not fatal; the next poll retries
            Err(e) => {
                warn!(item = %item_id, error = %e, "fetch failed");
                return Ok(());
            }
        };

        if !item.is_auction {
            return Ok(());
        }

        let snapshot = item.snapshot();

        match self.floors.get(item_id).copied() {
            None => {
                debug!(
                    item = %item_id,
                    floor = snapshot.floor,
                    end = ?snapshot.window.end_time(),
                    "watching auction"
                );
                self.event_writer
                    .write(&[Event::Marketplace(MarketplaceEvent::Listed(
                        snapshot.clone(),
                    ))])?;
                self.floors.insert(item_id.clone(), snapshot.floor);
                self.start_ticker(item_id, &snapshot);
            }
            Some(prev) if snapshot.floor > prev => {
                self.event_writer
                    .write(&[Event::Marketplace(MarketplaceEvent::BidConfirmed(
                        ItemBid {
                            item: item_id.clone(),
                            amount: snapshot.floor,
                        },
                    ))])?;
                self.floors.insert(item_id.clone(), snapshot.floor);
            }
            Some(_) => {}
        }

        if snapshot.window.phase(Utc::now()) == AuctionPhase::Ended {
            self.event_writer
                .write(&[Event::Marketplace(MarketplaceEvent::Closed(
                    item_id.clone(),
                ))])?;
            self.closed.insert(item_id.clone());
            // the ticker has rendered the terminal label and stopped
            // itself; reap it so the thread is joined
            self.tickers.remove(item_id);
            self.watchlist.unwatch(item_id);
        }

        Ok(())
    }

    fn start_ticker(&mut self, item_id: &ItemId, snapshot: &AuctionSnapshot) {
        let board = self.board.clone();
        let id = item_id.clone();
        let handle = spawn_countdown(snapshot.window, move |label| board.set(&id, label));
        self.tickers.insert(item_id.clone(), handle);
    }
}

impl LoopService for MarketplaceReceiver {
    fn run_iteration(&mut self) -> Result<()> {
        for item_id in self.watchlist.snapshot() {
            if self.closed.contains(&item_id) {
                continue;
            }
            self.poll_item(&item_id)?;
        }

        // tickers whose windows ran out stopped themselves; reap them
        self.tickers.retain(|_, ticker| !ticker.is_finished());

        // TODO: back off when the watchlist has been empty for a while
        std::thread::sleep(self.poll_interval);
        Ok(())
    }
}
