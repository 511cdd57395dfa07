//! Bidding Engine
//!
//! Tracks each auction we watch (bidding window + floor) and decides
//! whether a submitted bid goes out to the marketplace. The floor only
//! moves on server-confirmed bids; a submission is validated against
//! the floor and the window, and the outcome goes back on the log
//! either way.
use crate::auction::{
    validate_bid, Amount, AuctionPhase, AuctionWindow, BidRejection, BidState, ItemId, ItemIdRef,
};
use crate::event::{
    AuctionSnapshot, BidRejected, BidSubmission, BiddingEvent, Event, ItemBid, MarketplaceEvent,
    UiEvent,
};
use crate::event_log;
use crate::service::{LogFollowerService, ServiceId};
use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub const BIDDING_ENGINE_SERVICE_ID: &str = "bidding-engine";

/// A store for the current state of each auction we watch
pub trait AuctionStateStore: Send + Sync {
    fn load(&self, item_id: ItemIdRef) -> Result<Option<AuctionEntry>>;
    fn store(&self, item_id: ItemIdRef, entry: AuctionEntry) -> Result<()>;
}

pub type SharedAuctionStateStore = Arc<dyn AuctionStateStore + 'static>;

#[derive(Default)]
pub struct InMemoryAuctionStateStore(Mutex<BTreeMap<ItemId, AuctionEntry>>);

impl InMemoryAuctionStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedAuctionStateStore {
        Arc::new(Self::new())
    }
}

impl AuctionStateStore for InMemoryAuctionStateStore {
    fn load(&self, item_id: ItemIdRef) -> Result<Option<AuctionEntry>> {
        Ok(self.0.lock().get(item_id).copied())
    }

    fn store(&self, item_id: ItemIdRef, entry: AuctionEntry) -> Result<()> {
        self.0.lock().insert(item_id.to_owned(), entry);
        Ok(())
    }
}

/// Client-side state of one auction: the window and the floor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuctionEntry {
    pub window: AuctionWindow,
    pub bids: BidState,
}

impl AuctionEntry {
    pub fn from_snapshot(snapshot: &AuctionSnapshot) -> Self {
        Self {
            window: snapshot.window,
            bids: BidState::new(snapshot.floor),
        }
    }

    pub fn handle_confirmed_bid(self, amount: Amount) -> Self {
        Self {
            bids: self.bids.confirm(amount),
            ..self
        }
    }

    pub fn handle_closed(self) -> Self {
        Self {
            window: AuctionWindow::already_ended(),
            ..self
        }
    }

    pub fn ensure_open(&self, now: DateTime<Utc>) -> Result<(), BidRejection> {
        match self.window.phase(now) {
            AuctionPhase::Open => Ok(()),
            AuctionPhase::Ended => Err(BidRejection::AlreadyEnded),
        }
    }
}

pub struct BiddingEngine {
    store: SharedAuctionStateStore,
    event_writer: event_log::SharedWriter,
}

impl BiddingEngine {
    pub fn new(store: SharedAuctionStateStore, event_writer: event_log::SharedWriter) -> Self {
        Self {
            store,
            event_writer,
        }
    }

    fn handle_snapshot(&self, snapshot: &AuctionSnapshot) -> Result<()> {
        // server state is authoritative for both floor and window
        self.store
            .store(&snapshot.item, AuctionEntry::from_snapshot(snapshot))
    }

    fn handle_confirmed_bid(&self, bid: &ItemBid) -> Result<()> {
        if let Some(entry) = self.store.load(&bid.item)? {
            self.store
                .store(&bid.item, entry.handle_confirmed_bid(bid.amount))?;
        }
        Ok(())
    }

    fn handle_closed(&self, item_id: ItemIdRef) -> Result<()> {
        if let Some(entry) = self.store.load(item_id)? {
            self.store.store(item_id, entry.handle_closed())?;
        }
        Ok(())
    }

    /// Validate one submission at `now` and put the outcome on the log.
    pub fn handle_bid_submission(
        &self,
        submission: &BidSubmission,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let entry = self.store.load(&submission.item)?;
        let outcome = Self::decide(entry, submission, now);

        let event = match outcome {
            Ok(bid) => BiddingEvent::Accepted(bid),
            Err(reason) => BiddingEvent::Rejected(BidRejected {
                item: submission.item.clone(),
                reason,
            }),
        };
        self.event_writer.write(&[Event::Bidding(event)])?;
        Ok(())
    }

    fn decide(
        entry: Option<AuctionEntry>,
        submission: &BidSubmission,
        now: DateTime<Utc>,
    ) -> Result<ItemBid, BidRejection> {
        let entry = entry.ok_or_else(|| BidRejection::UnknownItem(submission.item.clone()))?;

        entry.ensure_open(now)?;
        let amount = validate_bid(&submission.raw_amount, entry.bids.floor())?;

        Ok(ItemBid {
            item: submission.item.clone(),
            amount,
        })
    }
}

impl LogFollowerService for BiddingEngine {
    fn service_id(&self) -> ServiceId {
        BIDDING_ENGINE_SERVICE_ID.to_owned()
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Marketplace(MarketplaceEvent::Listed(snapshot)) => {
                self.handle_snapshot(&snapshot)
            }
            Event::Marketplace(MarketplaceEvent::BidConfirmed(bid)) => {
                self.handle_confirmed_bid(&bid)
            }
            Event::Marketplace(MarketplaceEvent::Closed(item_id)) => self.handle_closed(&item_id),
            Event::Ui(UiEvent::BidSubmitted(submission)) => {
                debug!(item = %submission.item, "bid submitted");
                self.handle_bid_submission(&submission, Utc::now())
            }
            _ => Ok(()),
        }
    }
}
