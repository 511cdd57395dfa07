//! Wire types for the remote marketplace backend
//!
//! The backend is a plain JSON REST api. Ids arrive as numbers on some
//! endpoints and strings on others, and `auction_end_time` has been
//! seen in both ISO-8601 and epoch-millisecond form, so both get
//! normalized here at the boundary.
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::auction::{amount_from_naira, Amount, AuctionWindow, ItemId, ItemIdRef};
use crate::event::AuctionSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(deserialize_with = "id_string")]
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub starting_price: f64,
    #[serde(default)]
    pub current_highest_bid: Option<f64>,
    #[serde(default)]
    pub is_auction: bool,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub auction_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub seller_username: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Minimum acceptable next bid: highest bid so far, or the
    /// starting price while no bids exist.
    pub fn floor(&self) -> Amount {
        amount_from_naira(self.current_highest_bid.unwrap_or(self.starting_price))
    }

    pub fn window(&self) -> AuctionWindow {
        AuctionWindow::from_end_time(self.auction_end_time)
    }

    pub fn snapshot(&self) -> AuctionSnapshot {
        AuctionSnapshot {
            item: self.id.clone(),
            floor: self.floor(),
            window: self.window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub item_id: ItemId,
    pub bid_amount: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Flash-sale countdown payload. The backend reports seconds left;
/// that gets pinned to an absolute deadline immediately so later ticks
/// don't drift.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FlashSaleTimer {
    #[serde(rename = "timeRemaining")]
    pub time_remaining: Option<i64>,
}

impl FlashSaleTimer {
    pub fn window(&self, now: DateTime<Utc>) -> AuctionWindow {
        match self.time_remaining {
            Some(secs) => AuctionWindow::until(now + chrono::Duration::seconds(secs)),
            None => AuctionWindow::already_ended(),
        }
    }
}

/// Listing query filters, straight off the buyer page controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemFilters {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub is_auction: Option<bool>,
}

impl ItemFilters {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(university) = &self.university {
            pairs.push(("university", university.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(is_auction) = self.is_auction {
            pairs.push(("is_auction", is_auction.to_string()));
        }
        pairs
    }
}

/// Reference tying a backend bid/purchase to its payment, in the
/// backend's `BIDIT-{item}-{nonce}` shape. The payment flow itself
/// lives outside this engine; only the reference crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRef(String);

impl PaymentRef {
    pub fn for_item(item_id: ItemIdRef, now: DateTime<Utc>) -> Self {
        Self(format!("BIDIT-{}-{}", item_id, now.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<ItemId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        String(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::String(s) => s,
    })
}

/// Accepts RFC 3339 strings and epoch milliseconds; anything else maps
/// to `None`, which downstream reads as an already-ended window.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(parse_end_time))
}

fn parse_end_time(value: serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::AuctionPhase;
    use chrono::TimeZone;

    #[test]
    fn item_floor_falls_back_to_starting_price() {
        let mut item: Item = serde_json::from_value(serde_json::json!({
            "id": 7,
            "title": "calculus textbook",
            "starting_price": 1500.0,
            "is_auction": true,
        }))
        .unwrap();
        assert_eq!(item.floor(), amount_from_naira(1500.0));

        item.current_highest_bid = Some(2000.0);
        assert_eq!(item.floor(), amount_from_naira(2000.0));
    }

    #[test]
    fn end_time_accepts_iso_and_epoch_and_rejects_garbage() {
        let parse = |v: serde_json::Value| parse_end_time(v);

        assert_eq!(
            parse(serde_json::json!("2026-08-06T12:00:00Z")),
            Some(Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap())
        );
        assert_eq!(
            parse(serde_json::json!(1_700_000_000_000_i64)),
            Some(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
        );
        assert_eq!(parse(serde_json::json!("next tuesday")), None);
        assert_eq!(parse(serde_json::json!(true)), None);
    }

    #[test]
    fn malformed_end_time_means_window_already_over() {
        let item: Item = serde_json::from_value(serde_json::json!({
            "id": "12",
            "title": "desk lamp",
            "starting_price": 900.0,
            "is_auction": true,
            "auction_end_time": "whenever",
        }))
        .unwrap();
        assert_eq!(item.window().phase(Utc::now()), AuctionPhase::Ended);
    }

    #[test]
    fn filters_render_only_set_fields() {
        let filters = ItemFilters {
            category: Some("books".to_owned()),
            is_auction: Some(true),
            ..Default::default()
        };
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("category", "books".to_owned()),
                ("is_auction", "true".to_owned())
            ]
        );
        assert!(ItemFilters::default().query_pairs().is_empty());
    }

    #[test]
    fn payment_ref_shape() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(
            PaymentRef::for_item("42", now).as_str(),
            "BIDIT-42-1700000000000"
        );
    }
}
