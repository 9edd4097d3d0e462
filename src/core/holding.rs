//! # Post-success hold window.
//!
//! After a successful run the process may stay up for a while (e.g. so logs
//! can be collected or peers can still reach the liveness endpoint).

use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};

/// Waits `duration` or until `token` fires, whichever comes first.
///
/// Zero is a no-op and publishes nothing. Returns `true` if the full window
/// elapsed.
pub async fn hold(bus: &Bus, token: &CancellationToken, duration: Duration) -> bool {
    if duration.is_zero() {
        return true;
    }
    bus.publish(Event::new(EventKind::HoldStarted).with_delay(duration));

    select! {
        biased;
        _ = token.cancelled() => false,
        _ = time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn full_window_elapses() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let started = time::Instant::now();

        assert!(hold(&bus, &CancellationToken::new(), Duration::from_secs(30)).await);
        assert!(started.elapsed() >= Duration::from_secs(30));

        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::HoldStarted);
        assert_eq!(ev.delay_ms, Some(30_000));
    }

    #[tokio::test]
    async fn zero_is_noop() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        assert!(hold(&bus, &CancellationToken::new(), Duration::ZERO).await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancellation_cuts_window_short() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(!hold(&Bus::new(8), &token, Duration::from_secs(3600)).await);
    }
}
