use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use expression_index::index::handlers::{
    SymbolIndex, handle_add, handle_exact_search, handle_get_expression, handle_search,
};
use expression_index::index::{FMeasureRanker, SymbolPairExtractor};
use expression_index::storage::handlers::handle_batch;
use expression_index::storage::protocol::ENDPOINT_BATCH;
use expression_index::storage::{MemoryStore, RemoteStore, RemoteStoreConfig, Store};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --bind <addr:port> [--store <addr:port>] [--store-timeout-ms <ms>]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:6000", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:6001 --store 127.0.0.1:6000",
            args[0]
        );

        std::process::exit(1);
    }

    let mut bind_addr: Option<SocketAddr> = None;
    let mut store_addr: Option<SocketAddr> = None;
    let mut store_timeout: Option<Duration> = None;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--bind", Some(value)) => {
                bind_addr = Some(value.parse()?);
                i += 2;
            }
            ("--store", Some(value)) => {
                store_addr = Some(value.parse()?);
                i += 2;
            }
            ("--store-timeout-ms", Some(value)) => {
                store_timeout = Some(Duration::from_millis(value.parse()?));
                i += 2;
            }
            (flag, _) => {
                tracing::warn!("Ignoring unrecognised argument {}", flag);
                i += 1;
            }
        }
    }

    let bind_addr = bind_addr.ok_or_else(|| anyhow::anyhow!("--bind is required"))?;

    let app = match store_addr {
        Some(addr) => {
            let mut config = RemoteStoreConfig::new(addr);
            if let Some(timeout) = store_timeout {
                config.timeout = timeout;
            }
            tracing::info!("Using remote store at {} (timeout {:?})", addr, config.timeout);
            let store = Arc::new(RemoteStore::new(config));
            index_routes(store)
        }
        None => {
            tracing::info!("Hosting in-memory store on this node");
            let store = Arc::new(MemoryStore::new());

            let stats_store = store.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(30));
                loop {
                    interval.tick().await;
                    tracing::info!(
                        "Store stats: {} keys across {} partitions",
                        stats_store.local_entry_count(),
                        stats_store.local_partition_count()
                    );
                }
            });

            index_routes(store.clone())
                .route(ENDPOINT_BATCH, post(handle_batch))
                .layer(Extension(store))
        }
    };

    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn index_routes<S: Store + 'static>(store: Arc<S>) -> Router {
    let index: Arc<SymbolIndex<S>> = Arc::new(SymbolIndex::new(
        store,
        SymbolPairExtractor::new(),
        FMeasureRanker,
    ));

    Router::new()
        .route("/expressions", post(handle_add::<S>))
        .route("/expressions/:id", get(handle_get_expression::<S>))
        .route("/search", post(handle_search::<S>))
        .route("/exact_search", post(handle_exact_search::<S>))
        .layer(Extension(index))
}
