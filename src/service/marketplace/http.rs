use super::{MarketplaceClient, SharedMarketplaceClient};
use crate::auction::{amount_as_naira, Amount, ItemIdRef};
use crate::config::Config;
use crate::marketplace::{BidRecord, FlashSaleTimer, Item, ItemFilters, PaymentRef, Profile};
use crate::session::Session;
use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpMarketplaceClient {
    base_url: String,
    http: Client,
    session: Option<Session>,
}

impl HttpMarketplaceClient {
    pub fn new(config: &Config, session: Option<Session>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building http client")?;

        Ok(Self {
            base_url: config.backend_url.trim_end_matches('/').to_owned(),
            http,
            session,
        })
    }

    pub fn new_shared(config: &Config, session: Option<Session>) -> Result<SharedMarketplaceClient> {
        Ok(Arc::new(Self::new(config, session)?))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match &self.session {
            Some(session) => Ok(request.header(AUTHORIZATION, session.bearer())),
            None => bail!("not logged in"),
        }
    }
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

/// Surface the backend's own message when it has one, the bare status
/// otherwise.
fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ApiError>()
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    bail!("backend rejected request: {message}")
}

impl MarketplaceClient for HttpMarketplaceClient {
    fn fetch_item(&self, item_id: ItemIdRef) -> Result<Item> {
        let response = self
            .http
            .get(self.url(&format!("/api/items/{item_id}")))
            .send()?;
        Ok(check(response)?.json()?)
    }

    fn fetch_items(&self, filters: &ItemFilters) -> Result<Vec<Item>> {
        let response = self
            .http
            .get(self.url("/api/items"))
            .query(&filters.query_pairs())
            .send()?;
        Ok(check(response)?.json()?)
    }

    fn fetch_bids(&self, item_id: ItemIdRef) -> Result<Vec<BidRecord>> {
        let response = self
            .http
            .get(self.url(&format!("/api/bids/item/{item_id}")))
            .send()?;
        Ok(check(response)?.json()?)
    }

    fn place_bid(&self, item_id: ItemIdRef, amount: Amount, payment: &PaymentRef) -> Result<()> {
        let request = self.http.post(self.url("/api/bids/place-bid")).json(
            &serde_json::json!({
                "item_id": item_id,
                "bid_amount": amount_as_naira(amount),
                "transaction_ref": payment.as_str(),
            }),
        );
        check(self.authed(request)?.send()?)?;
        Ok(())
    }

    fn buy_now(&self, item_id: ItemIdRef, payment: &PaymentRef) -> Result<()> {
        let request = self
            .http
            .post(self.url("/api/bids/buy-now"))
            .json(&serde_json::json!({
                "item_id": item_id,
                "transaction_ref": payment.as_str(),
            }));
        check(self.authed(request)?.send()?)?;
        Ok(())
    }

    fn my_listings(&self) -> Result<Vec<Item>> {
        let request = self.http.get(self.url("/api/items/my"));
        Ok(check(self.authed(request)?.send()?)?.json()?)
    }

    fn delete_listing(&self, item_id: ItemIdRef) -> Result<()> {
        let request = self.http.delete(self.url(&format!("/api/items/{item_id}")));
        check(self.authed(request)?.send()?)?;
        Ok(())
    }

    fn fetch_profile(&self) -> Result<Profile> {
        let request = self.http.get(self.url("/api/users/me"));
        Ok(check(self.authed(request)?.send()?)?.json()?)
    }

    fn flash_sale_timer(&self) -> Result<FlashSaleTimer> {
        let response = self.http.get(self.url("/api/flash-sales/timer")).send()?;
        Ok(check(response)?.json()?)
    }
}
