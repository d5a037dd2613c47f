// ===============================
// src/catalog.rs (product catalog poller)
// ===============================
//
// Keeps the product list fresh enough that the cart's soft caps are not
// wildly stale. Fetches once at start, then on a fixed interval, and
// immediately when the category filter changes or a checkout asks for a
// refresh.
//
// Overlapping fetches can resolve out of order (filter change racing a poll
// tick). Every dispatch gets a monotonically increasing token and a result is
// applied only if its token is the latest issued, so a superseded response
// can never overwrite a newer one.

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::domain::{Event, Product};
use crate::metrics::{CATALOG_DISCARDED, CATALOG_FETCHES, CATALOG_PRODUCTS};

#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub seq: u64,
    pub fetched_at: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub products: Vec<Product>,
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self {
            seq: 0,
            fetched_at: Utc::now(),
            category_id: None,
            products: Vec::new(),
        }
    }
}

impl CatalogSnapshot {
    pub fn find(&self, product_id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.product_id == product_id)
    }
}

/// Last-issued-wins admission for overlapping fetches.
#[derive(Debug, Default)]
pub struct FetchGuard {
    issued: u64,
}

impl FetchGuard {
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    pub fn admits(&self, token: u64) -> bool {
        token == self.issued
    }
}

type FetchResult = (u64, Option<i64>, Result<Vec<Product>, ApiError>);

fn dispatch(
    api: &ApiClient,
    guard: &mut FetchGuard,
    category_id: Option<i64>,
    done_tx: &mpsc::Sender<FetchResult>,
) {
    let token = guard.issue();
    let api = api.clone();
    let done_tx = done_tx.clone();
    tokio::spawn(async move {
        let result = api.fetch_inventory(category_id).await;
        let _ = done_tx.send((token, category_id, result)).await;
    });
}

pub async fn run(
    api: ApiClient,
    snap_tx: watch::Sender<CatalogSnapshot>,
    mut filter_rx: watch::Receiver<Option<i64>>,
    mut refresh_rx: mpsc::Receiver<()>,
    poll_interval_secs: u64,
    rec_tx: mpsc::Sender<Event>,
) {
    let mut tick = interval(Duration::from_secs(poll_interval_secs.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let (done_tx, mut done_rx) = mpsc::channel::<FetchResult>(16);
    let mut guard = FetchGuard::default();

    loop {
        tokio::select! {
            // first tick fires immediately: that is the on-start fetch
            _ = tick.tick() => {
                let cat = *filter_rx.borrow();
                dispatch(&api, &mut guard, cat, &done_tx);
            }
            changed = filter_rx.changed() => {
                if changed.is_err() {
                    info!("filter channel closed, poller stopping");
                    break;
                }
                let cat = *filter_rx.borrow();
                debug!(?cat, "category filter changed, refetching");
                dispatch(&api, &mut guard, cat, &done_tx);
            }
            Some(()) = refresh_rx.recv() => {
                let cat = *filter_rx.borrow();
                dispatch(&api, &mut guard, cat, &done_tx);
            }
            Some((token, category_id, result)) = done_rx.recv() => {
                if !guard.admits(token) {
                    debug!(token, "discarding superseded catalog response");
                    CATALOG_DISCARDED.inc();
                    continue;
                }
                match result {
                    Ok(products) => {
                        CATALOG_FETCHES.with_label_values(&["ok"]).inc();
                        CATALOG_PRODUCTS.set(products.len() as i64);
                        let _ = rec_tx.try_send(Event::Catalog {
                            seq: token,
                            products: products.len(),
                        });
                        let snap = CatalogSnapshot {
                            seq: token,
                            fetched_at: Utc::now(),
                            category_id,
                            products,
                        };
                        if snap_tx.send(snap).is_err() {
                            info!("snapshot receivers gone, poller stopping");
                            break;
                        }
                    }
                    Err(e) => {
                        // stale list stays displayed; next tick retries
                        CATALOG_FETCHES.with_label_values(&["err"]).inc();
                        warn!(%e, "catalog fetch failed");
                    }
                }
            }
        }
    }
}
