// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proactive reissue timing.
//!
//! The deadline is always derived from the persisted issuance time, never
//! from a running countdown — platform timers do not fire while the process
//! is suspended, so on resume the broker recomputes [`fire_delay`] and either
//! fires immediately or rearms.

use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Delay until the proactive reissue for a token issued at `issued_at_ms`.
///
/// `None` means the deadline already passed and the refresh should run now.
pub fn fire_delay(issued_at_ms: u64, interval: Duration, now_ms: u64) -> Option<Duration> {
    let fire_at = issued_at_ms.saturating_add(interval.as_millis() as u64);
    if fire_at <= now_ms {
        None
    } else {
        Some(Duration::from_millis(fire_at - now_ms))
    }
}

/// Handle for the one-shot proactive refresh timer.
///
/// The broker owns the sleeping task; this guards the cancellation token so
/// rearming always disarms the previous timer and `cancel` is idempotent.
#[derive(Default)]
pub struct ExpiryTimer {
    armed: Mutex<Option<CancellationToken>>,
}

impl ExpiryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a new timer, cancelling any previous one. Returns the token the
    /// sleeping task must select on.
    pub fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(prev) = self.armed.lock().replace(token.clone()) {
            prev.cancel();
        }
        token
    }

    /// Disarm the timer. Safe to call repeatedly or with nothing armed.
    pub fn cancel(&self) {
        if let Some(prev) = self.armed.lock().take() {
            prev.cancel();
        }
    }
}
