// ===============================
// src/main.rs
// ===============================
//
// borsipos — Börsibaar point-of-sale terminal engine for one bar station.
//
// Polls the backend product catalog, keeps a crash-tolerant per-station cart
// on disk, applies operator commands (add/plus/minus/remove/clear), and
// submits sales to the backend, which remains the source of truth for
// pricing and stock. Exposes Prometheus metrics and records JSONL events.
//
//   borsipos 3 --backend-url http://localhost:8080
//
//   > list            # catalog view
//   > add 7           # one unit of product 7
//   > + 7             # one more
//   > show            # cart view
//   > checkout        # submit the sale
//
mod api;
mod cart;
mod catalog;
mod checkout;
mod config;
mod domain;
mod metrics;
mod recorder;
mod session;
mod store;

use ahash::AHashMap as HashMap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::cart::Cart;
use crate::catalog::CatalogSnapshot;
use crate::checkout::Checkout;
use crate::domain::Event;
use crate::session::Command;
use crate::store::CartStore;

async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match Command::parse(&line) {
            Some(cmd) => {
                if tx.send(cmd).await.is_err() {
                    break;
                }
            }
            None => println!("unrecognized command: {line}"),
        }
    }
}

#[tokio::main]
async fn main() {
    // ---- Logging ----
    tracing_subscriber::fmt().with_env_filter("info").init();

    // ---- Load config & limits ----
    let (args, limits) = config::load();

    // ---- Metrics ----
    metrics::init();
    tokio::spawn(metrics::serve_metrics(args.metrics_port));

    info!(
        station = args.station_id,
        backend = %args.backend_base_url,
        poll_secs = args.poll_interval_secs,
        cart_dir = %args.cart_dir,
        category = ?args.category,
        "startup config"
    );
    metrics::CONFIG_STATION
        .with_label_values(&[&args.station_id.to_string()])
        .set(1);

    let api = match ApiClient::new(&args.backend_base_url, args.session_cookie.clone()) {
        Ok(api) => api,
        Err(e) => {
            error!(%e, "bad backend configuration");
            return;
        }
    };

    // ---- Recorder (optional) ----
    let (rec_tx, rec_rx) = mpsc::channel::<Event>(8192);
    if let Some(path) = args.record_file.clone() {
        tokio::spawn(recorder::run(rec_rx, path));
    }

    // ---- Station metadata & access check ----
    let station = match api.fetch_station(args.station_id).await {
        Ok(s) => s,
        Err(e) => {
            match e.status().map(|s| s.as_u16()) {
                Some(403) | Some(404) => {
                    error!(station = args.station_id, "you don't have access to this station")
                }
                _ => error!(%e, "failed to fetch station"),
            }
            return;
        }
    };
    if !station.is_active {
        warn!(station = %station.name, "station is marked inactive");
    }
    info!(station = %station.name, org = station.organization_id, "station resolved");

    // ---- Category names (display only; fetch failure is non-fatal) ----
    let categories: HashMap<i64, String> = match api.fetch_categories().await {
        Ok(cats) => cats.into_iter().map(|c| (c.id, c.name)).collect(),
        Err(e) => {
            warn!(%e, "category fetch failed, names unavailable");
            HashMap::new()
        }
    };

    // ---- Cart: load the persisted copy for this station ----
    let store = CartStore::new(&args.cart_dir);
    let cart = Cart::from_lines(store.load(args.station_id));
    if !cart.is_empty() {
        info!(
            lines = cart.line_count(),
            units = cart.unit_count(),
            "restored persisted cart"
        );
    }

    // ---- Catalog poller ----
    let (filter_tx, filter_rx) = watch::channel(args.category);
    let (refresh_tx, refresh_rx) = mpsc::channel::<()>(8);
    let (snap_tx, snap_rx) = watch::channel(CatalogSnapshot::default());
    tokio::spawn(catalog::run(
        api.clone(),
        snap_tx,
        filter_rx,
        refresh_rx,
        args.poll_interval_secs,
        rec_tx.clone(),
    ));

    // ---- Operator commands from stdin ----
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(64);
    tokio::spawn(read_commands(cmd_tx));

    let _ = rec_tx.try_send(Event::Note(format!(
        "session started at station {}",
        station.name
    )));

    // ---- Session loop (owns the cart until quit) ----
    let checkout = Checkout::new(
        api,
        station.id,
        station.name.clone(),
        limits.max_sale_items,
    );
    session::run(
        cmd_rx, snap_rx, filter_tx, refresh_tx, rec_tx, cart, store, station, categories, checkout,
    )
    .await;
}
