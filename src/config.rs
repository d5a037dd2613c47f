// ===============================
// src/config.rs
// ===============================
use std::env;

use clap::Parser;
use dotenvy::dotenv;

/// Börsibaar POS terminal engine for one bar station.
#[derive(Debug, Parser)]
#[command(name = "borsipos", version)]
pub struct Cli {
    /// Station this terminal is bound to (carts are partitioned per station).
    pub station_id: i64,

    /// Backend base URL; overrides BACKEND_BASE_URL.
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Initial category filter for the catalog view.
    #[arg(long)]
    pub category: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct Args {
    pub station_id: i64,
    pub backend_base_url: String,
    pub category: Option<i64>,

    // catalog polling
    pub poll_interval_secs: u64,

    // local cart persistence
    pub cart_dir: String,

    // files/metrics
    pub record_file: Option<String>,
    pub metrics_port: u16,

    // forwarded verbatim as the `Cookie` header (session auth lives in the
    // proxy layer; here it collapses to one configured value)
    pub session_cookie: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Limits {
    /// Backend rejects sales with more items than this; refuse locally too.
    pub max_sale_items: usize,
}

pub fn load() -> (Args, Limits) {
    let _ = dotenv();

    let cli = Cli::parse();

    let backend_base_url = cli
        .backend_url
        .or_else(|| env::var("BACKEND_BASE_URL").ok())
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let category = cli.category.or_else(|| {
        env::var("CATEGORY_ID").ok().and_then(|s| s.parse().ok())
    });

    let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    let cart_dir = env::var("CART_DIR").unwrap_or_else(|_| "./carts".to_string());

    let record_file = env::var("RECORD_FILE").ok();
    let metrics_port = env::var("METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9898);

    let session_cookie = env::var("SESSION_COOKIE").ok().filter(|s| !s.is_empty());

    let args = Args {
        station_id: cli.station_id,
        backend_base_url,
        category,
        poll_interval_secs,
        cart_dir,
        record_file,
        metrics_port,
        session_cookie,
    };

    let max_sale_items = env::var("MAX_SALE_ITEMS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);

    let limits = Limits { max_sale_items };
    (args, limits)
}
