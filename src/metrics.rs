// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Catalog poller --------
pub static CATALOG_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("catalog_fetches_total", "inventory fetches by outcome"),
        &["outcome"],
    )
    .unwrap()
});

pub static CATALOG_PRODUCTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("catalog_products", "products in the last applied snapshot").unwrap()
});

pub static CATALOG_DISCARDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "catalog_responses_discarded_total",
        "superseded fetch responses dropped by the token guard",
    )
    .unwrap()
});

// -------- Cart --------
pub static CART_MUTATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cart_mutations_total",
            "cart mutator calls (labels: op, outcome)",
        ),
        &["op", "outcome"],
    )
    .unwrap()
});

pub static CART_LINES: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("cart_lines", "lines currently in the cart").unwrap());

pub static CART_UNITS: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("cart_units", "total units currently in the cart").unwrap());

// -------- Checkout --------
pub static SALES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sales_total", "checkout attempts by outcome"),
        &["outcome"],
    )
    .unwrap()
});

pub static SALE_UNITS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("sale_units_total", "units sold via completed sales").unwrap());

pub static LAT_CHECKOUT_MS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(HistogramOpts::new(
        "checkout_latency_ms",
        "Latency of POST /sales (ms)",
    ))
    .unwrap()
});

// ---- Config visibility ----
pub static CONFIG_STATION: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_station", "bound station (label: station)"),
        &["station"],
    )
    .unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(CATALOG_FETCHES.clone())),
        REGISTRY.register(Box::new(CATALOG_PRODUCTS.clone())),
        REGISTRY.register(Box::new(CATALOG_DISCARDED.clone())),
        REGISTRY.register(Box::new(CART_MUTATIONS.clone())),
        REGISTRY.register(Box::new(CART_LINES.clone())),
        REGISTRY.register(Box::new(CART_UNITS.clone())),
        REGISTRY.register(Box::new(SALES.clone())),
        REGISTRY.register(Box::new(SALE_UNITS.clone())),
        REGISTRY.register(Box::new(LAT_CHECKOUT_MS.clone())),
        REGISTRY.register(Box::new(CONFIG_STATION.clone())),
    ] {
        let _ = m;
    }
}

// Encode all metrics in Prometheus text format
fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

// Serve one HTTP request (GET / or /metrics) — tiny HTTP 1.1 responder
fn handle_client(mut stream: TcpStream) {
    // Read a bit to consume headers (no full parse)
    let mut _req_buf = [0u8; 1024];
    let _ = stream.read(&mut _req_buf);

    let body = encode_metrics();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

// Run the metrics server in a dedicated OS thread (keeps Tokio runtime clean)
pub async fn serve_metrics(port: u16) {
    thread::spawn(move || {
        let addr = format!("0.0.0.0:{port}");
        let listener = match TcpListener::bind(&addr) {
            Ok(l) => l,
            Err(e) => {
                eprintln!("metrics bind {addr} failed: {e}");
                return;
            }
        };
        eprintln!("metrics listening on http://{addr}/ (and /metrics)");

        for conn in listener.incoming() {
            match conn {
                Ok(stream) => handle_client(stream),
                Err(e) => eprintln!("metrics accept error: {}", e),
            }
        }
    });
}
