//! Combo streak and score multiplier

use serde::{Deserialize, Serialize};

use crate::consts::{COMBO_TIMEOUT_MS, MAX_COMBO_MULTIPLIER};

/// Time-windowed combo state
///
/// `multiplier` stays within `1..=5`. Idle decay drops it back to 1; the
/// first hit of a fresh streak starts at 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboTracker {
    pub count: u32,
    pub multiplier: u32,
    /// Wall-clock time of the last scoring hit (ms)
    pub last_hit_ms: Option<f64>,
    pub max_combo: u32,
    #[serde(default = "default_timeout")]
    pub timeout_ms: f64,
}

fn default_timeout() -> f64 {
    COMBO_TIMEOUT_MS
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self {
            count: 0,
            multiplier: 1,
            last_hit_ms: None,
            max_combo: 0,
            timeout_ms: COMBO_TIMEOUT_MS,
        }
    }
}

impl ComboTracker {
    /// Record a scoring hit at `now_ms` and return the multiplier to apply
    pub fn register_hit(&mut self, now_ms: f64) -> u32 {
        let within_window = self
            .last_hit_ms
            .is_some_and(|last| now_ms - last < self.timeout_ms);

        if within_window {
            self.count += 1;
            self.multiplier = (self.count + 1).min(MAX_COMBO_MULTIPLIER);
        } else {
            self.count = 1;
            self.multiplier = 2;
        }
        self.max_combo = self.max_combo.max(self.count);
        self.last_hit_ms = Some(now_ms);
        self.multiplier
    }

    /// Reset the streak if the window elapsed without a hit
    ///
    /// Returns true when a live streak was dropped.
    pub fn decay(&mut self, now_ms: f64) -> bool {
        let expired = self
            .last_hit_ms
            .is_some_and(|last| now_ms - last >= self.timeout_ms);
        if expired && self.count > 0 {
            self.count = 0;
            self.multiplier = 1;
            return true;
        }
        false
    }

    /// Score a hit: `base * multiplier`, registering the hit first
    pub fn score_hit(&mut self, base: u64, now_ms: f64) -> u64 {
        base * u64::from(self.register_hit(now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_hit_starts_streak_at_two() {
        let mut combo = ComboTracker::default();
        assert_eq!(combo.multiplier, 1);
        assert_eq!(combo.register_hit(1000.0), 2);
        assert_eq!(combo.count, 1);
    }

    #[test]
    fn test_hits_inside_window_extend_then_reset() {
        let mut combo = ComboTracker::default();
        let first = combo.register_hit(1000.0);
        let second = combo.register_hit(1500.0);
        assert!(second > first);
        assert_eq!(combo.count, 2);

        // 3000 ms later is outside the 2000 ms window
        combo.register_hit(4500.0);
        assert_eq!(combo.count, 1);
        assert_eq!(combo.multiplier, 2);
        assert_eq!(combo.max_combo, 2);
    }

    #[test]
    fn test_multiplier_caps_at_five() {
        let mut combo = ComboTracker::default();
        for i in 0..20 {
            combo.register_hit(i as f64 * 100.0);
        }
        assert_eq!(combo.multiplier, 5);
        assert_eq!(combo.count, 20);
        assert_eq!(combo.max_combo, 20);
    }

    #[test]
    fn test_idle_decay() {
        let mut combo = ComboTracker::default();
        combo.register_hit(0.0);
        combo.register_hit(100.0);
        assert!(!combo.decay(1500.0));
        assert_eq!(combo.multiplier, 3);
        assert!(combo.decay(2100.0));
        assert_eq!(combo.count, 0);
        assert_eq!(combo.multiplier, 1);
        // Already decayed
        assert!(!combo.decay(5000.0));
    }

    #[test]
    fn test_score_hit_applies_multiplier() {
        let mut combo = ComboTracker::default();
        assert_eq!(combo.score_hit(5, 0.0), 10);
        assert_eq!(combo.score_hit(5, 10.0), 15);
    }

    proptest! {
        #[test]
        fn prop_multiplier_in_bounds(gaps in proptest::collection::vec(0.0f64..5000.0, 1..64)) {
            let mut combo = ComboTracker::default();
            let mut now = 0.0;
            for gap in gaps {
                now += gap;
                combo.decay(now);
                prop_assert!((1..=5).contains(&combo.multiplier));
                combo.register_hit(now);
                prop_assert!((1..=5).contains(&combo.multiplier));
            }
        }
    }
}
