//! Auction domain logic
//!
//! Everything here is pure: the countdown formatter and the bid
//! validator take the current time / the raw user input as arguments,
//! so every page-level use (product view, buyer cards, flash sale)
//! goes through the same code instead of carrying its own copy.
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

pub type ItemId = String;
pub type ItemIdRef<'s> = &'s str;

/// Money amount in kobo (minor units).
///
/// The backend speaks naira; convert at the wire boundary so floor
/// comparisons stay exact.
pub type Amount = u64;

pub const KOBO_PER_NAIRA: f64 = 100.0;

pub const ENDED_LABEL: &str = "Auction Ended";

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

pub fn amount_from_naira(naira: f64) -> Amount {
    (naira * KOBO_PER_NAIRA).round() as Amount
}

pub fn amount_as_naira(amount: Amount) -> f64 {
    amount as f64 / KOBO_PER_NAIRA
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BidRejection {
    #[error("bid is not a number")]
    NotANumber,
    #[error("bid is too low")]
    TooLow { floor: Amount },
    #[error("auction already ended")]
    AlreadyEnded,
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AuctionPhase {
    Open,
    Ended,
}

/// The (immutable) bidding window of one auction.
///
/// A missing end time means the window is treated as already over:
/// when the backend hands us something unparseable we fail toward
/// blocking further bids, not allowing them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct AuctionWindow {
    end_time: Option<DateTime<Utc>>,
}

impl AuctionWindow {
    pub fn until(end_time: DateTime<Utc>) -> Self {
        Self {
            end_time: Some(end_time),
        }
    }

    pub fn from_end_time(end_time: Option<DateTime<Utc>>) -> Self {
        Self { end_time }
    }

    pub fn already_ended() -> Self {
        Self { end_time: None }
    }

    pub fn end_time(self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// `Ended` exactly when `now >= end_time`. One-directional: there
    /// is no reopening.
    pub fn phase(self, now: DateTime<Utc>) -> AuctionPhase {
        match self.end_time {
            Some(end) if now < end => AuctionPhase::Open,
            _ => AuctionPhase::Ended,
        }
    }

    /// Time left in the window, `None` once the window is over.
    ///
    /// Always derived from the absolute end time so a caller that was
    /// suspended between ticks still gets the right answer.
    pub fn remaining(self, now: DateTime<Utc>) -> Option<RemainingTime> {
        let end = self.end_time?;
        let left_ms = end.signed_duration_since(now).num_milliseconds();
        if left_ms <= 0 {
            None
        } else {
            Some(RemainingTime::from_millis(left_ms))
        }
    }
}

/// Remaining window time decomposed for display.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RemainingTime {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl RemainingTime {
    fn from_millis(ms: i64) -> Self {
        let days = ms / MS_PER_DAY;
        let ms = ms % MS_PER_DAY;
        let hours = ms / MS_PER_HOUR;
        let ms = ms % MS_PER_HOUR;
        let minutes = ms / MS_PER_MINUTE;
        let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
        Self {
            days,
            hours,
            minutes,
            seconds,
        }
    }
}

impl fmt::Display for RemainingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days > 0 {
            write!(f, "{}d {}h", self.days, self.hours)
        } else if self.hours > 0 {
            write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
        } else {
            write!(f, "{}m {}s", self.minutes, self.seconds)
        }
    }
}

/// Countdown label for one window at one instant. Never negative,
/// never panics; the terminal label once the window is over.
pub fn format_remaining(window: AuctionWindow, now: DateTime<Utc>) -> String {
    match window.remaining(now) {
        None => ENDED_LABEL.to_owned(),
        Some(left) => left.to_string(),
    }
}

/// The bidding floor of one auction: current highest bid, or the
/// starting price while no bids exist.
///
/// Only ever raised by a server-confirmed bid, never optimistically.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct BidState {
    floor: Amount,
}

impl BidState {
    pub fn new(floor: Amount) -> Self {
        Self { floor }
    }

    pub fn floor(self) -> Amount {
        self.floor
    }

    pub fn ensure_valid_bid(self, amount: Amount) -> Result<(), BidRejection> {
        if amount <= self.floor {
            return Err(BidRejection::TooLow { floor: self.floor });
        }
        Ok(())
    }

    /// Raise the floor to a server-confirmed bid. A stale confirmation
    /// below the current floor leaves the state untouched.
    pub fn confirm(self, amount: Amount) -> Self {
        Self {
            floor: self.floor.max(amount),
        }
    }
}

/// Validate raw user input against the current floor.
///
/// Accepted iff the input is a finite number strictly greater than the
/// floor; ties are rejected. The two rejection reasons are distinct so
/// the caller can surface the right message.
pub fn validate_bid(raw: &str, floor: Amount) -> Result<Amount, BidRejection> {
    let naira: f64 = raw.trim().parse().map_err(|_| BidRejection::NotANumber)?;
    if !naira.is_finite() {
        return Err(BidRejection::NotANumber);
    }
    let amount = amount_from_naira(naira.max(0.0));
    BidState::new(floor).ensure_valid_bid(amount)?;
    Ok(amount)
}
