use {
    bytes::*,
    cache_levels::{
        cache::{implementation::moka::*, *},
        dispatch::*,
        fetcher::{reqwest::*, *},
        promise::*,
    },
    std::{env, time::*},
    tokio::*,
    tracing_subscriber::{EnvFilter, fmt},
};

// Fetches a URL twice through a memory level on top of the network
//
// Pay attention to the tracing log: the first get is a memory miss followed by a fetch, the second
// is a memory hit
//
//   cargo run --example fetch -- https://www.rust-lang.org/

const CACHE_SIZE: u64 = 1024 * 1024; // 1 MiB

const DEFAULT_URL: &str = "https://example.com/";

#[main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "cache_levels=debug".into()),
        )
        .init();

    let url = env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.into());

    let fetcher = NetworkFetcher::<ReqwestTransport>::default()
        .dispatcher(SerialDispatcher::spawn())
        .user_agent("cache-levels-demo")
        .expect("user_agent")
        .parse_request_timeout("30s")
        .expect("parse_request_timeout");

    let levels = TieredLevel::new(MemoryLevel::<Bytes>::with_max_capacity(CACHE_SIZE), fetcher);

    for attempt in 1..=2 {
        let start = Instant::now();

        let outcome = levels.get(&url).await;

        match outcome {
            Outcome::Success(payload) => tracing::info!(
                "attempt {}: {} bytes in {:?}",
                attempt,
                payload.len(),
                start.elapsed()
            ),

            Outcome::Failure(error) => {
                tracing::error!("attempt {}: error {:?}: {}", attempt, error.code(), error)
            }

            Outcome::Cancelled => tracing::warn!("attempt {}: cancelled", attempt),
        }
    }

    // The fetcher is still reachable through the tiers
    tracing::info!("requests in flight: {}", levels.next.pending_count());
}
