// ===============================
// src/cart.rs (cart state & mutators)
// ===============================
//
// The cart is the authoritative record of the in-progress sale for one
// station. Lines keep insertion order. Invariants:
// - at most one line per product_id
// - 1 <= quantity <= max_quantity for every line (a line that would violate
//   this is removed, never stored)
//
// Over-limit mutations are rejected, not clamped. The caller decides what to
// do with a rejection; the original UI showed nothing, so the session layer
// only logs it at debug level.

use crate::domain::{CartLine, Product};

/// Outcome of a single mutator call. The silent-no-op behavior of the
/// original lives one layer up; here callers and tests can tell "already
/// satisfied" apart from "rejected".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    /// Increment would exceed the max_quantity captured at add-time.
    RejectedStockLimit,
    /// Product had zero stock when the add was attempted.
    RejectedOutOfStock,
    /// The mutation drove the line's quantity to zero or below.
    Removed,
    NotInCart,
}

impl Mutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mutation::Applied => "applied",
            Mutation::RejectedStockLimit => "rejected_stock_limit",
            Mutation::RejectedOutOfStock => "rejected_out_of_stock",
            Mutation::Removed => "removed",
            Mutation::NotInCart => "not_in_cart",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn unit_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Display total from the price snapshots. Never sent to the backend.
    pub fn total(&self) -> f64 {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn find(&self, product_id: i64) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Add one unit of `product`. An existing line increments against the
    /// ceiling captured when the line was created, not against the product's
    /// current stock.
    pub fn add(&mut self, product: &Product) -> Mutation {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product.product_id)
        {
            if line.quantity < line.max_quantity {
                line.quantity += 1;
                Mutation::Applied
            } else {
                Mutation::RejectedStockLimit
            }
        } else if product.quantity > 0 {
            self.lines.push(CartLine {
                product_id: product.product_id,
                product_name: product.product_name.clone(),
                quantity: 1,
                max_quantity: product.quantity,
                unit_price: product.unit_price,
            });
            Mutation::Applied
        } else {
            Mutation::RejectedOutOfStock
        }
    }

    /// Apply a signed quantity delta. Driving the quantity to zero or below
    /// removes the line; exceeding max_quantity drops the delta entirely.
    pub fn update_quantity(&mut self, product_id: i64, delta: i64) -> Mutation {
        let Some(idx) = self.lines.iter().position(|l| l.product_id == product_id) else {
            return Mutation::NotInCart;
        };

        let new_quantity = self.lines[idx].quantity + delta;
        if new_quantity <= 0 {
            self.lines.remove(idx);
            Mutation::Removed
        } else if new_quantity <= self.lines[idx].max_quantity {
            self.lines[idx].quantity = new_quantity;
            Mutation::Applied
        } else {
            Mutation::RejectedStockLimit
        }
    }

    pub fn remove(&mut self, product_id: i64) -> Mutation {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        if self.lines.len() < before {
            Mutation::Removed
        } else {
            Mutation::NotInCart
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(product_id: i64, stock: i64, price: f64) -> Product {
        Product {
            id: product_id + 1000,
            organization_id: 1,
            product_id,
            product_name: format!("product-{product_id}"),
            quantity: stock,
            unit_price: price,
            base_price: price,
            updated_at: None,
        }
    }

    #[test]
    fn add_creates_line_with_snapshot_fields() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(&product(7, 10, 2.50)), Mutation::Applied);

        let line = cart.find(7).unwrap();
        assert_eq!(line.quantity, 1);
        assert_eq!(line.max_quantity, 10);
        assert_eq!(line.unit_price, 2.50);
    }

    #[test]
    fn repeated_adds_never_duplicate_lines() {
        let mut cart = Cart::new();
        let p = product(7, 3, 1.0);
        for _ in 0..5 {
            cart.add(&p);
        }
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.find(7).unwrap().quantity, 3);
    }

    #[test]
    fn add_at_ceiling_is_rejected_not_clamped() {
        let mut cart = Cart::new();
        let p = product(1, 2, 1.0);
        cart.add(&p);
        cart.add(&p);
        assert_eq!(cart.add(&p), Mutation::RejectedStockLimit);
        assert_eq!(cart.find(1).unwrap().quantity, 2);
    }

    #[test]
    fn zero_stock_product_creates_no_line() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(&product(9, 0, 1.0)), Mutation::RejectedOutOfStock);
        assert!(cart.is_empty());
    }

    #[test]
    fn ceiling_is_captured_at_add_time() {
        let mut cart = Cart::new();
        cart.add(&product(4, 2, 1.0));
        cart.add(&product(4, 2, 1.0));
        // stock rose since the line was created; the captured ceiling still rules
        assert_eq!(cart.add(&product(4, 50, 1.0)), Mutation::RejectedStockLimit);
        assert_eq!(cart.find(4).unwrap().quantity, 2);
    }

    #[test]
    fn update_over_max_drops_delta_entirely() {
        let mut cart = Cart::new();
        let p = product(3, 5, 1.0);
        for _ in 0..5 {
            cart.add(&p);
        }
        assert_eq!(cart.update_quantity(3, 1), Mutation::RejectedStockLimit);
        assert_eq!(cart.find(3).unwrap().quantity, 5);

        // a large positive delta is dropped, not partially applied
        assert_eq!(cart.update_quantity(3, 10), Mutation::RejectedStockLimit);
        assert_eq!(cart.find(3).unwrap().quantity, 5);
    }

    #[test]
    fn update_to_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add(&product(2, 5, 1.0));
        assert_eq!(cart.update_quantity(2, -1), Mutation::Removed);
        assert!(cart.find(2).is_none());
    }

    #[test]
    fn update_below_zero_removes_line() {
        let mut cart = Cart::new();
        let p = product(2, 5, 1.0);
        cart.add(&p);
        cart.add(&p);
        assert_eq!(cart.update_quantity(2, -7), Mutation::Removed);
        assert!(cart.is_empty());
    }

    #[test]
    fn update_unknown_product_is_not_in_cart() {
        let mut cart = Cart::new();
        assert_eq!(cart.update_quantity(42, 1), Mutation::NotInCart);
    }

    #[test]
    fn remove_is_unconditional_and_idempotent() {
        let mut cart = Cart::new();
        cart.add(&product(6, 4, 1.0));
        assert_eq!(cart.remove(6), Mutation::Removed);
        assert_eq!(cart.remove(6), Mutation::NotInCart);
        assert!(cart.is_empty());
    }

    #[test]
    fn clear_twice_is_fine() {
        let mut cart = Cart::new();
        cart.add(&product(1, 2, 1.0));
        cart.clear();
        assert!(cart.is_empty());
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut cart = Cart::new();
        cart.add(&product(3, 5, 1.0));
        cart.add(&product(1, 5, 1.0));
        cart.add(&product(2, 5, 1.0));
        cart.add(&product(1, 5, 1.0)); // increment, must not reorder

        let ids: Vec<i64> = cart.lines().iter().map(|l| l.product_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn quantity_bounds_hold_under_mixed_mutations() {
        let mut cart = Cart::new();
        let p = product(8, 3, 2.0);
        cart.add(&p);
        cart.update_quantity(8, 2);
        cart.update_quantity(8, 5);
        cart.update_quantity(8, -1);
        cart.add(&p);

        for line in cart.lines() {
            assert!(line.quantity >= 1 && line.quantity <= line.max_quantity);
        }
    }

    #[test]
    fn totals_use_price_snapshots() {
        let mut cart = Cart::new();
        let p = product(5, 10, 2.50);
        cart.add(&p);
        cart.add(&p);
        cart.add(&p);
        assert_eq!(cart.unit_count(), 3);
        assert!((cart.total() - 7.50).abs() < f64::EPSILON);
    }
}
