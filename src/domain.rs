// ===============================
// src/domain.rs
// ===============================
use serde::{Deserialize, Serialize};

/// One inventory row as served by `GET /inventory`. Read-only on this side;
/// the cart copies fields out of it at add-time and never writes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub organization_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub base_price: f64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarStation {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
}

/// One product's presence in the in-progress sale.
///
/// `max_quantity` and `unit_price` are snapshots taken when the line was
/// created; they are not re-synced when the catalog refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub max_quantity: i64,
    pub unit_price: f64,
}

impl CartLine {
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: i64,
    pub quantity: i64,
}

/// Outbound body for `POST /sales`. No price fields: the backend prices the
/// sale itself; sending the snapshot would move that trust boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub items: Vec<SaleItem>,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar_station_id: Option<i64>,
}

/// Events written by the JSONL recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Cart {
        op: String,
        product_id: i64,
        outcome: String,
    },
    Sale {
        items: usize,
        outcome: String,
    },
    Catalog {
        seq: u64,
        products: usize,
    },
    Note(String),
}
