use crate::auction::{Amount, AuctionWindow, BidRejection, ItemId};

/// Everything the services say to each other goes through the log as
/// one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Marketplace(MarketplaceEvent),
    Bidding(BiddingEvent),
    Ui(UiEvent),
    #[cfg(test)]
    Test,
}

/// A bid on one item, in kobo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemBid {
    pub item: ItemId,
    pub amount: Amount,
}

/// Server-side auction state as last observed, reduced to what the
/// bidding engine needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuctionSnapshot {
    pub item: ItemId,
    pub floor: Amount,
    pub window: AuctionWindow,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarketplaceEvent {
    /// An auction item was (re)observed on the backend
    Listed(AuctionSnapshot),
    /// The backend confirmed a bid; the floor moves here and only here
    BidConfirmed(ItemBid),
    /// The auction passed its end time
    Closed(ItemId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BiddingEvent {
    /// A validated bid, ready to be submitted to the backend
    Accepted(ItemBid),
    /// A bid that failed validation; the reason goes back to the user
    Rejected(BidRejected),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BidRejected {
    pub item: ItemId,
    pub reason: BidRejection,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    /// Raw form input; validation happens in the bidding engine
    BidSubmitted(BidSubmission),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BidSubmission {
    pub item: ItemId,
    pub raw_amount: String,
}
