//! Chronologically ordered child keys for appended records

use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 8;

/// Generates keys that sort lexicographically in creation order
///
/// Layout: 12 hex digits of milliseconds, 6 hex digits of a per-millisecond
/// counter, then a random suffix so two clients appending in the same
/// millisecond do not collide. If the clock steps backwards the last seen
/// millisecond is reused, keeping keys monotonic.
#[derive(Debug, Default)]
pub struct PushKeyGenerator {
    state: Mutex<(i64, u32)>,
}

impl PushKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self) -> String {
        self.generate_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn generate_at(&self, now_millis: i64) -> String {
        let (millis, counter) = {
            let mut state = self.state.lock();
            if now_millis > state.0 {
                *state = (now_millis, 0);
            } else {
                state.1 += 1;
            }
            *state
        };

        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();

        format!("{:012x}{:06x}{}", millis.max(0), counter, suffix)
    }
}
