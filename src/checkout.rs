// ===============================
// src/checkout.rs (sale submitter)
// ===============================
//
// Converts the current cart into a sale, submits it, and reconciles local
// state with the outcome. Strictly all-or-nothing from this side: on success
// the cart is cleared and a catalog refresh is requested; on any failure the
// cart is left byte-for-byte as it was and the backend's error text is
// surfaced to the operator. No retry.

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::cart::Cart;
use crate::domain::{SaleItem, SaleRequest};
use crate::metrics::{LAT_CHECKOUT_MS, SALES, SALE_UNITS};
use crate::store::CartStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleOutcome {
    Completed { items: usize },
    /// Empty cart is a no-op, not an error.
    EmptyCart,
    /// The backend caps items per sale; refuse locally with the same limit.
    TooManyItems { limit: usize },
    /// Raw backend body or transport error, cart untouched.
    Failed(String),
}

impl SaleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleOutcome::Completed { .. } => "completed",
            SaleOutcome::EmptyCart => "empty_cart",
            SaleOutcome::TooManyItems { .. } => "too_many_items",
            SaleOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub struct Checkout {
    api: ApiClient,
    station_id: i64,
    station_name: String,
    max_sale_items: usize,
    in_flight: bool,
}

impl Checkout {
    pub fn new(
        api: ApiClient,
        station_id: i64,
        station_name: String,
        max_sale_items: usize,
    ) -> Self {
        Self {
            api,
            station_id,
            station_name,
            max_sale_items,
            in_flight: false,
        }
    }

    /// Exposed so a front end can disable the action while a sale is out.
    /// Nothing here enforces mutual exclusion beyond the session loop itself.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Snapshot the cart into the outbound request. Quantities and ids only;
    /// the backend prices the sale at its own current prices.
    pub fn build_request(&self, cart: &Cart) -> SaleRequest {
        SaleRequest {
            items: cart
                .lines()
                .iter()
                .map(|l| SaleItem {
                    product_id: l.product_id,
                    quantity: l.quantity,
                })
                .collect(),
            notes: format!("POS Sale - Station: {}", self.station_name),
            bar_station_id: Some(self.station_id),
        }
    }

    pub async fn process_sale(
        &mut self,
        cart: &mut Cart,
        store: &CartStore,
        refresh_tx: &mpsc::Sender<()>,
    ) -> SaleOutcome {
        if cart.is_empty() {
            return SaleOutcome::EmptyCart;
        }
        if cart.line_count() > self.max_sale_items {
            let outcome = SaleOutcome::TooManyItems {
                limit: self.max_sale_items,
            };
            SALES.with_label_values(&[outcome.as_str()]).inc();
            return outcome;
        }

        let request = self.build_request(cart);
        let items = request.items.len();
        let units = cart.unit_count();

        self.in_flight = true;
        let started = Instant::now();
        let result = self.api.submit_sale(&request).await;
        self.in_flight = false;
        LAT_CHECKOUT_MS.observe(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(()) => {
                cart.clear();
                if let Err(e) = store.save(self.station_id, cart.lines()) {
                    warn!(?e, "failed to persist cleared cart");
                }
                // displayed stock should reflect the sale promptly
                let _ = refresh_tx.try_send(());
                SALES.with_label_values(&["completed"]).inc();
                SALE_UNITS.inc_by(units as u64);
                info!(items, units, "sale completed");
                SaleOutcome::Completed { items }
            }
            Err(e) => {
                SALES.with_label_values(&["failed"]).inc();
                SaleOutcome::Failed(e.user_message())
            }
        }
    }
}
