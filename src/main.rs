mod auction;
mod config;
mod event;
mod event_log;
mod marketplace;
mod service;
mod session;

use anyhow::Result;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env()?;
    let session = config.token.clone().map(session::Session::new);

    let (event_writer, event_reader) = event_log::new_in_memory_shared();
    let auction_state_store = service::bidding_engine::InMemoryAuctionStateStore::new_shared();
    let watchlist = service::marketplace::Watchlist::new_shared();
    let board = service::countdown::DisplayBoard::new_shared();
    let client = service::marketplace::HttpMarketplaceClient::new_shared(&config, session)?;

    let svc_ctl = service::ServiceControl::new();

    ctrlc::set_handler({
        let svc_ctl = svc_ctl.clone();
        move || {
            eprintln!("Stopping all services...");
            svc_ctl.stop_all();
        }
    })?;

    let ui = service::ui::Ui::new(
        &config,
        event_writer.clone(),
        client.clone(),
        watchlist.clone(),
        board.clone(),
    )?;

    for handle in vec![
        svc_ctl.spawn_log_follower(
            service::bidding_engine::BiddingEngine::new(auction_state_store, event_writer.clone()),
            event_reader.clone(),
        ),
        svc_ctl.spawn_log_follower(
            service::marketplace::MarketplaceSender::new(client.clone()),
            event_reader.clone(),
        ),
        svc_ctl.spawn_log_follower(service::ui::Notifier, event_reader.clone()),
        svc_ctl.spawn_loop(service::marketplace::MarketplaceReceiver::new(
            client,
            watchlist,
            event_writer,
            board,
            config.poll_interval,
        )),
        svc_ctl.spawn_loop(ui),
    ] {
        handle.join()?
    }

    Ok(())
}

#[cfg(test)]
mod tests;
