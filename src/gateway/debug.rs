use std::{
    env,
    future::Future,
    sync::OnceLock,
    time::{Duration, Instant},
};

use tracing::Instrument;

const DEBUG_DELAY_ENV: &str = "DRUGPRICE_DEBUG_GATEWAY_DELAY_MS";

/// Runs one backend call inside a span, returning its result and wall time.
pub async fn send_request<F, Fut, T, E>(operation: &'static str, send: F) -> (Result<T, E>, Duration)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let span = tracing::debug_span!("gateway", operation);
    async move {
        debug_gateway_delay().await;
        let started = Instant::now();
        let result = send().await;
        let elapsed = started.elapsed();
        tracing::trace!(
            elapsed_ms = elapsed.as_millis(),
            ok = result.is_ok(),
            "Gateway request finished"
        );
        (result, elapsed)
    }
    .instrument(span)
    .await
}

async fn debug_gateway_delay() {
    if let Some(delay) = debug_gateway_delay_duration() {
        tracing::trace!(delay_ms = delay.as_millis(), "Applying debug gateway delay");
        tokio::time::sleep(delay).await;
    }
}

fn debug_gateway_delay_duration() -> Option<Duration> {
    static DELAY: OnceLock<Option<Duration>> = OnceLock::new();
    *DELAY.get_or_init(|| {
        let Ok(raw) = env::var(DEBUG_DELAY_ENV) else {
            return None;
        };
        parse_delay(&raw)
    })
}

fn parse_delay(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!(env = DEBUG_DELAY_ENV, value = %raw, "Invalid gateway debug delay");
            None
        }
    }
}
