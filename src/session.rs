// ===============================
// src/session.rs (operator command loop)
// ===============================
//
// The UI seam. One task owns the cart and applies every mutation
// synchronously, so commands take effect in the order the operator issued
// them. Rejected mutations stay silent toward the operator (debug log only);
// checkout failures are surfaced loudly with the backend's own words.

use ahash::AHashMap as HashMap;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::cart::{Cart, Mutation};
use crate::catalog::CatalogSnapshot;
use crate::checkout::{Checkout, SaleOutcome};
use crate::domain::{BarStation, Event};
use crate::metrics::{CART_LINES, CART_MUTATIONS, CART_UNITS};
use crate::store::CartStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add one unit of a product from the catalog (creates or increments).
    Add(i64),
    /// Increment an existing line by one.
    Plus(i64),
    /// Decrement an existing line by one (removes at zero).
    Minus(i64),
    Remove(i64),
    Clear,
    Checkout,
    Filter(Option<i64>),
    /// Print the cart.
    Show,
    /// Print the catalog view.
    List,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Command> {
        let mut tokens = line.split_whitespace();
        let verb = tokens.next()?.to_ascii_lowercase();
        let arg = tokens.next();

        let id = |a: Option<&str>| a.and_then(|s| s.parse::<i64>().ok());

        match verb.as_str() {
            "add" | "a" => id(arg).map(Command::Add),
            "plus" | "+" => id(arg).map(Command::Plus),
            "minus" | "-" => id(arg).map(Command::Minus),
            "remove" | "rm" => id(arg).map(Command::Remove),
            "clear" => Some(Command::Clear),
            "checkout" | "sale" => Some(Command::Checkout),
            "cat" | "filter" => match arg {
                Some("all") | None => Some(Command::Filter(None)),
                other => id(other).map(|c| Command::Filter(Some(c))),
            },
            "show" | "cart" => Some(Command::Show),
            "list" | "ls" => Some(Command::List),
            "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

fn persist(store: &CartStore, station_id: i64, cart: &Cart) {
    if let Err(e) = store.save(station_id, cart.lines()) {
        // non-fatal: a lost cart is recoverable by re-adding items
        warn!(?e, "cart persist failed");
    }
    CART_LINES.set(cart.line_count() as i64);
    CART_UNITS.set(cart.unit_count());
}

fn note_mutation(rec_tx: &mpsc::Sender<Event>, op: &str, product_id: i64, outcome: Mutation) {
    CART_MUTATIONS
        .with_label_values(&[op, outcome.as_str()])
        .inc();
    let _ = rec_tx.try_send(Event::Cart {
        op: op.to_string(),
        product_id,
        outcome: outcome.as_str().to_string(),
    });
    match outcome {
        Mutation::Applied | Mutation::Removed => {}
        // the original UI gives no feedback on these; keep them quiet
        rejected => debug!(op, product_id, ?rejected, "mutation rejected"),
    }
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("cart is empty");
        return;
    }
    for line in cart.lines() {
        println!(
            "  {:>3} x {:<24} @ {:>7.2}  = {:>8.2}  (max {})",
            line.quantity,
            line.product_name,
            line.unit_price,
            line.line_total(),
            line.max_quantity
        );
    }
    println!(
        "  {} lines, {} units, total {:.2}",
        cart.line_count(),
        cart.unit_count(),
        cart.total()
    );
}

fn print_catalog(snap: &CatalogSnapshot, cart: &Cart, categories: &HashMap<i64, String>) {
    let cat_label = match snap.category_id {
        Some(id) => categories
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("category {id}")),
        None => "all categories".to_string(),
    };
    println!(
        "catalog ({}, {} products, fetched {}):",
        cat_label,
        snap.products.len(),
        snap.fetched_at.format("%H:%M:%S")
    );
    for p in &snap.products {
        let in_cart = cart
            .find(p.product_id)
            .map(|l| l.quantity)
            .unwrap_or_default();
        println!(
            "  #{:<5} {:<24} stock {:>4}  price {:>7.2}  (base {:>6.2}){}",
            p.product_id,
            p.product_name,
            p.quantity,
            p.unit_price,
            p.base_price,
            if in_cart > 0 {
                format!("  [in cart: {in_cart}]")
            } else {
                String::new()
            }
        );
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    mut cmd_rx: mpsc::Receiver<Command>,
    snap_rx: watch::Receiver<CatalogSnapshot>,
    filter_tx: watch::Sender<Option<i64>>,
    refresh_tx: mpsc::Sender<()>,
    rec_tx: mpsc::Sender<Event>,
    mut cart: Cart,
    store: CartStore,
    station: BarStation,
    categories: HashMap<i64, String>,
    mut checkout: Checkout,
) {
    let station_id = station.id;
    CART_LINES.set(cart.line_count() as i64);
    CART_UNITS.set(cart.unit_count());

    let mut heartbeat = interval(Duration::from_secs(30));
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_cmd = cmd_rx.recv() => {
                let Some(cmd) = maybe_cmd else {
                    info!("command channel closed, session ending");
                    break;
                };
                match cmd {
                    Command::Add(product_id) => {
                        let outcome = match snap_rx.borrow().find(product_id) {
                            Some(product) => cart.add(product),
                            None => {
                                debug!(product_id, "product not in current catalog view");
                                continue;
                            }
                        };
                        note_mutation(&rec_tx, "add", product_id, outcome);
                        if outcome == Mutation::Applied {
                            persist(&store, station_id, &cart);
                        }
                    }
                    Command::Plus(product_id) => {
                        let outcome = cart.update_quantity(product_id, 1);
                        note_mutation(&rec_tx, "plus", product_id, outcome);
                        if outcome == Mutation::Applied {
                            persist(&store, station_id, &cart);
                        }
                    }
                    Command::Minus(product_id) => {
                        let outcome = cart.update_quantity(product_id, -1);
                        note_mutation(&rec_tx, "minus", product_id, outcome);
                        if matches!(outcome, Mutation::Applied | Mutation::Removed) {
                            persist(&store, station_id, &cart);
                        }
                    }
                    Command::Remove(product_id) => {
                        let outcome = cart.remove(product_id);
                        note_mutation(&rec_tx, "remove", product_id, outcome);
                        if outcome == Mutation::Removed {
                            persist(&store, station_id, &cart);
                        }
                    }
                    Command::Clear => {
                        cart.clear();
                        persist(&store, station_id, &cart);
                        let _ = rec_tx.try_send(Event::Note("cart cleared".into()));
                    }
                    Command::Checkout => {
                        if checkout.is_in_flight() {
                            continue;
                        }
                        let items_before = cart.line_count();
                        let outcome = checkout
                            .process_sale(&mut cart, &store, &refresh_tx)
                            .await;
                        let _ = rec_tx.try_send(Event::Sale {
                            items: items_before,
                            outcome: outcome.as_str().to_string(),
                        });
                        match outcome {
                            SaleOutcome::Completed { items } => {
                                CART_LINES.set(0);
                                CART_UNITS.set(0);
                                println!("sale completed ({items} lines)");
                            }
                            SaleOutcome::EmptyCart => {}
                            SaleOutcome::TooManyItems { limit } => {
                                error!(limit, "sale refused: too many items for one sale");
                                println!("Error processing sale: more than {limit} items");
                            }
                            SaleOutcome::Failed(msg) => {
                                // the blocking alert of the original UI
                                error!(%msg, "sale failed");
                                println!("Error processing sale: {msg}");
                            }
                        }
                    }
                    Command::Filter(category) => {
                        let _ = filter_tx.send(category);
                    }
                    Command::Show => print_cart(&cart),
                    Command::List => print_catalog(&snap_rx.borrow(), &cart, &categories),
                    Command::Quit => {
                        info!("operator quit");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                info!(
                    station = station_id,
                    lines = cart.line_count(),
                    units = cart.unit_count(),
                    catalog = snap_rx.borrow().products.len(),
                    "heartbeat"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cart_mutators() {
        assert_eq!(Command::parse("add 7"), Some(Command::Add(7)));
        assert_eq!(Command::parse("a 7"), Some(Command::Add(7)));
        assert_eq!(Command::parse("+ 3"), Some(Command::Plus(3)));
        assert_eq!(Command::parse("- 3"), Some(Command::Minus(3)));
        assert_eq!(Command::parse("rm 12"), Some(Command::Remove(12)));
        assert_eq!(Command::parse("clear"), Some(Command::Clear));
    }

    #[test]
    fn parses_checkout_and_views() {
        assert_eq!(Command::parse("checkout"), Some(Command::Checkout));
        assert_eq!(Command::parse("sale"), Some(Command::Checkout));
        assert_eq!(Command::parse("show"), Some(Command::Show));
        assert_eq!(Command::parse("cart"), Some(Command::Show));
        assert_eq!(Command::parse("ls"), Some(Command::List));
        assert_eq!(Command::parse("quit"), Some(Command::Quit));
    }

    #[test]
    fn parses_category_filter() {
        assert_eq!(Command::parse("cat 3"), Some(Command::Filter(Some(3))));
        assert_eq!(Command::parse("cat all"), Some(Command::Filter(None)));
        assert_eq!(Command::parse("filter"), Some(Command::Filter(None)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("add"), None);
        assert_eq!(Command::parse("add x"), None);
        assert_eq!(Command::parse("frobnicate 1"), None);
    }

    #[test]
    fn parsing_is_case_insensitive_on_the_verb() {
        assert_eq!(Command::parse("ADD 7"), Some(Command::Add(7)));
        assert_eq!(Command::parse("Checkout"), Some(Command::Checkout));
    }
}
