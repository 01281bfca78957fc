// Copyright 2026 hotcache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::atomic::{AtomicU64, Ordering};

/// Number of local events accumulated before they are published.
pub const FLUSH_THRESHOLD: u64 = 100;

/// A per-worker accumulator in front of a shared [`AtomicU64`].
///
/// Increments stay local until [`FLUSH_THRESHOLD`] events are pending, so the shared value lags behind the true count
/// by at most `FLUSH_THRESHOLD - 1` per worker. Anything deciding on the shared value must tolerate that lag.
#[derive(Debug, Default)]
pub struct LocalCounter {
    pending: u64,
}

impl LocalCounter {
    /// Count one event. Returns `true` if the pending events were published.
    #[inline]
    pub fn incr(&mut self, shared: &AtomicU64) -> bool {
        self.pending += 1;
        if self.pending >= FLUSH_THRESHOLD {
            self.flush(shared);
            return true;
        }
        false
    }

    /// Publish pending events.
    pub fn flush(&mut self, shared: &AtomicU64) {
        if self.pending > 0 {
            shared.fetch_add(self.pending, Ordering::Relaxed);
            self.pending = 0;
        }
    }

    /// Drop pending events without publishing them.
    pub fn discard(&mut self) {
        self.pending = 0;
    }

    /// Events not yet published.
    pub fn pending(&self) -> u64 {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_at_threshold() {
        let shared = AtomicU64::new(0);
        let mut local = LocalCounter::default();

        for _ in 0..FLUSH_THRESHOLD - 1 {
            assert!(!local.incr(&shared));
        }
        assert_eq!(shared.load(Ordering::Relaxed), 0);
        assert!(local.incr(&shared));
        assert_eq!(shared.load(Ordering::Relaxed), FLUSH_THRESHOLD);
        assert_eq!(local.pending(), 0);

        local.incr(&shared);
        local.flush(&shared);
        assert_eq!(shared.load(Ordering::Relaxed), FLUSH_THRESHOLD + 1);
    }
}
