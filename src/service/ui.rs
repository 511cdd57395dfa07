//! Local http surface
//!
//! What the browser frontend talks to: listing queries proxied to the
//! backend, bid submissions turned into `Ui` events for the bidding
//! engine, and the live countdown labels the tickers keep current.
use crate::{
    auction::format_remaining,
    config::Config,
    event::{BidSubmission, BiddingEvent, Event, UiEvent},
    event_log,
    marketplace::{BidRecord, Item, ItemFilters, PaymentRef, Profile},
    service::countdown::SharedDisplayBoard,
    service::marketplace::{SharedMarketplaceClient, SharedWatchlist},
    service::{LogFollowerService, LoopService, ServiceId},
};
use anyhow::{format_err, Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::{runtime::Runtime, sync::oneshot};
use tracing::{info, warn};

pub struct Ui {
    // cancels all server tasks on drop
    _runtime: Runtime,
    server_rx: oneshot::Receiver<Result<()>>,
}

impl Ui {
    pub fn new(
        config: &Config,
        event_writer: event_log::SharedWriter,
        client: SharedMarketplaceClient,
        watchlist: SharedWatchlist,
        board: SharedDisplayBoard,
    ) -> Result<Self> {
        let runtime = Runtime::new()?;

        let (tx, rx) = oneshot::channel();
        let listen_addr = config.listen_addr;
        let state = AppState {
            event_writer,
            client,
            watchlist,
            board,
        };

        runtime.spawn(async move {
            tx.send(
                run_http_server(listen_addr, state)
                    .await
                    .context("Failed to run http server"),
            )
            .expect("send to work");
        });

        Ok(Self {
            _runtime: runtime,
            server_rx: rx,
        })
    }
}

impl LoopService for Ui {
    fn run_iteration(&mut self) -> Result<()> {
        // don't hog the cpu
        std::thread::sleep(std::time::Duration::from_millis(100));

        match self.server_rx.try_recv() {
            Ok(res) => res,
            Err(oneshot::error::TryRecvError::Empty) => Ok(()),
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(format_err!("ui server died without leaving a response?!"))
            }
        }
    }
}

/// Surfaces bid outcomes from the log to the user.
pub struct Notifier;

impl LogFollowerService for Notifier {
    fn service_id(&self) -> ServiceId {
        "ui-notifier".to_owned()
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Bidding(BiddingEvent::Accepted(bid)) => {
                info!(item = %bid.item, amount = bid.amount, "bid accepted");
            }
            Event::Bidding(BiddingEvent::Rejected(rejected)) => {
                warn!(item = %rejected.item, reason = %rejected.reason, "bid rejected");
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    event_writer: event_log::SharedWriter,
    client: SharedMarketplaceClient,
    watchlist: SharedWatchlist,
    board: SharedDisplayBoard,
}

async fn run_http_server(listen_addr: SocketAddr, state: AppState) -> Result<()> {
    let app = Router::new()
        .route("/items", get(list_items))
        .route("/items/:id", get(get_item))
        .route("/items/:id/bids", get(get_item_bids))
        .route("/items/:id/countdown", get(get_countdown))
        .route("/bid", post(submit_bid))
        .route("/buy", post(buy_now))
        .route("/me", get(profile))
        .route("/my/listings", get(my_listings))
        .route("/my/listings/:id", delete(delete_listing))
        .route("/flash-sale", get(flash_sale))
        .with_state(state);

    axum::Server::try_bind(&listen_addr)?
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

type HttpResult<T> = std::result::Result<T, (StatusCode, String)>;

/// The marketplace client blocks; keep it off the server workers.
async fn blocking<T, F>(f: F) -> HttpResult<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))
}

#[derive(Deserialize)]
struct BidRequest {
    item_id: String,
    bid_amount: RawAmount,
}

#[derive(Deserialize)]
struct BuyRequest {
    item_id: String,
}

/// Form posts send the amount as text, api clients as a number; the
/// validator wants the raw text either way.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(f64),
}

impl RawAmount {
    fn into_string(self) -> String {
        match self {
            RawAmount::Text(s) => s,
            RawAmount::Number(n) => n.to_string(),
        }
    }
}

async fn list_items(
    State(state): State<AppState>,
    Query(filters): Query<ItemFilters>,
) -> HttpResult<Json<Vec<Item>>> {
    let items = blocking(move || state.client.fetch_items(&filters)).await?;
    Ok(Json(items))
}

async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> HttpResult<Json<Item>> {
    let item = blocking(move || {
        let item = state.client.fetch_item(&item_id)?;
        if item.is_auction {
            state.watchlist.watch(&item_id);
        }
        Ok(item)
    })
    .await?;
    Ok(Json(item))
}

async fn get_item_bids(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> HttpResult<Json<Vec<BidRecord>>> {
    let bids = blocking(move || state.client.fetch_bids(&item_id)).await?;
    Ok(Json(bids))
}

async fn get_countdown(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> HttpResult<Json<serde_json::Value>> {
    match state.board.get(&item_id) {
        Some(label) => Ok(Json(json!({ "item_id": item_id, "remaining": label }))),
        None => Err((StatusCode::NOT_FOUND, "countdown not tracked".to_owned())),
    }
}

async fn submit_bid(
    State(state): State<AppState>,
    Json(request): Json<BidRequest>,
) -> HttpResult<(StatusCode, Json<serde_json::Value>)> {
    blocking(move || {
        state.watchlist.watch(&request.item_id);
        state
            .event_writer
            .write(&[Event::Ui(UiEvent::BidSubmitted(BidSubmission {
                item: request.item_id,
                raw_amount: request.bid_amount.into_string(),
            }))])?;
        Ok(())
    })
    .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "submitted" }))))
}

async fn buy_now(
    State(state): State<AppState>,
    Json(request): Json<BuyRequest>,
) -> HttpResult<Json<serde_json::Value>> {
    blocking(move || {
        let payment = PaymentRef::for_item(&request.item_id, Utc::now());
        state.client.buy_now(&request.item_id, &payment)
    })
    .await?;
    Ok(Json(json!({ "status": "purchased" })))
}

async fn profile(State(state): State<AppState>) -> HttpResult<Json<Profile>> {
    let profile = blocking(move || state.client.fetch_profile()).await?;
    Ok(Json(profile))
}

async fn my_listings(State(state): State<AppState>) -> HttpResult<Json<Vec<Item>>> {
    let items = blocking(move || state.client.my_listings()).await?;
    Ok(Json(items))
}

async fn delete_listing(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> HttpResult<StatusCode> {
    blocking(move || state.client.delete_listing(&item_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn flash_sale(State(state): State<AppState>) -> HttpResult<Json<serde_json::Value>> {
    let label = blocking(move || {
        let timer = state.client.flash_sale_timer()?;
        let now = Utc::now();
        Ok(format_remaining(timer.window(now), now))
    })
    .await?;
    Ok(Json(json!({ "remaining": label })))
}
