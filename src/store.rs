// ===============================
// src/store.rs (per-station cart persistence)
// ===============================
//
// One JSON file per station under CART_DIR, named like the browser key the
// backend dashboard uses (`pos-cart-{stationId}`). The file is read once at
// startup and rewritten after every mutation; last writer wins, and in
// practice there is a single writer per station.
//
// Load failures are non-fatal: losing a POS cart is recoverable by re-adding
// items, so a missing or corrupt file just yields an empty cart.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::domain::CartLine;

#[derive(Debug, Clone)]
pub struct CartStore {
    dir: PathBuf,
}

impl CartStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, station_id: i64) -> PathBuf {
        self.dir.join(format!("pos-cart-{station_id}.json"))
    }

    /// Read the persisted cart for a station. Any failure degrades to an
    /// empty cart with a warning.
    pub fn load(&self, station_id: i64) -> Vec<CartLine> {
        let path = self.path(station_id);
        if !Path::new(&path).exists() {
            return Vec::new();
        }
        match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(lines) => lines,
                Err(e) => {
                    warn!(?e, path = %path.display(), "cart file unreadable, starting empty");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(?e, path = %path.display(), "cart file read failed, starting empty");
                Vec::new()
            }
        }
    }

    /// Overwrite the persisted cart. Errors bubble up so the caller can log
    /// and carry on; persistence failure never blocks a mutation.
    pub fn save(&self, station_id: i64, lines: &[CartLine]) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let raw = serde_json::to_string(lines)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(self.path(station_id), raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, quantity: i64) -> CartLine {
        CartLine {
            product_id,
            product_name: format!("product-{product_id}"),
            quantity,
            max_quantity: 10,
            unit_price: 2.50,
        }
    }

    #[test]
    fn round_trip_preserves_order_and_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CartStore::new(tmp.path());

        let lines = vec![line(3, 2), line(1, 5), line(2, 1)];
        store.save(17, &lines).unwrap();

        assert_eq!(store.load(17), lines);
    }

    #[test]
    fn stations_do_not_share_carts() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CartStore::new(tmp.path());

        store.save(1, &[line(7, 1)]).unwrap();
        store.save(2, &[line(8, 2)]).unwrap();

        assert_eq!(store.load(1)[0].product_id, 7);
        assert_eq!(store.load(2)[0].product_id, 8);
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CartStore::new(tmp.path());
        assert!(store.load(99).is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CartStore::new(tmp.path());
        fs::create_dir_all(tmp.path()).unwrap();
        fs::write(tmp.path().join("pos-cart-5.json"), "{not json").unwrap();
        assert!(store.load(5).is_empty());
    }

    #[test]
    fn save_overwrites_previous_cart() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CartStore::new(tmp.path());

        store.save(4, &[line(1, 1), line(2, 2)]).unwrap();
        store.save(4, &[]).unwrap();
        assert!(store.load(4).is_empty());
    }
}
