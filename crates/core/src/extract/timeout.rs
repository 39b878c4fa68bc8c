//! Size-adaptive decompiler deadline.

use serde::Serialize;
use std::time::Duration;

/// Minimum deadline, and the base every size adds to.
pub const BASE_TIMEOUT_MINUTES: f64 = 10.0;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Minutes allowed for a source of `size_bytes`.
///
/// 10 minutes plus 1 per MB, plus 0.5 per MB above 20 MB, plus another 0.5
/// per MB above 50 MB. Never below 10 minutes, no upper bound.
pub fn compute_timeout_minutes(size_bytes: u64) -> f64 {
    let mb = size_bytes as f64 / BYTES_PER_MB;
    let mut minutes = BASE_TIMEOUT_MINUTES + mb;
    if mb > 20.0 {
        minutes += (mb - 20.0) * 0.5;
    }
    if mb > 50.0 {
        minutes += (mb - 50.0) * 0.5;
    }
    minutes.max(BASE_TIMEOUT_MINUTES)
}

/// Longest deadline a run may be given: one week.
pub const MAX_TIMEOUT_MINUTES: f64 = 7.0 * 24.0 * 60.0;

/// Deadline for one decompiler run, fixed before launch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeoutPolicy {
    pub minutes: f64,
    pub overridden: bool,
}

impl TimeoutPolicy {
    /// Uses `override_minutes` when given, otherwise derives from the size.
    pub fn for_source(size_bytes: u64, override_minutes: Option<f64>) -> Self {
        match override_minutes {
            Some(minutes) => Self {
                minutes,
                overridden: true,
            },
            None => Self {
                minutes: compute_timeout_minutes(size_bytes),
                overridden: false,
            },
        }
    }

    /// Deadline as a duration, clamped to `0..=MAX_TIMEOUT_MINUTES`.
    pub fn duration(&self) -> Duration {
        let ceiling = Duration::from_secs((MAX_TIMEOUT_MINUTES * 60.0) as u64);
        Duration::try_from_secs_f64(self.minutes.clamp(0.0, MAX_TIMEOUT_MINUTES) * 60.0)
            .unwrap_or(ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_huge_override_is_clamped() {
        let policy = TimeoutPolicy::for_source(0, Some(1e18));
        assert_eq!(
            policy.duration(),
            Duration::from_secs((MAX_TIMEOUT_MINUTES * 60.0) as u64)
        );

        let policy = TimeoutPolicy::for_source(0, Some(f64::NAN));
        assert_eq!(
            policy.duration(),
            Duration::from_secs((MAX_TIMEOUT_MINUTES * 60.0) as u64)
        );
        assert_eq!(
            TimeoutPolicy::for_source(0, Some(1.5)).duration(),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn test_small_file_gets_base_plus_size() {
        assert_eq!(compute_timeout_minutes(0), 10.0);
        assert_eq!(compute_timeout_minutes(2 * MB), 12.0);
        assert_eq!(compute_timeout_minutes(20 * MB), 30.0);
    }

    #[test]
    fn test_tiers_above_20_and_50_mb() {
        // 10 + 30 + 0.5 * 10
        assert_eq!(compute_timeout_minutes(30 * MB), 45.0);
        // 10 + 100 + 0.5 * 80 + 0.5 * 50
        assert_eq!(compute_timeout_minutes(100 * MB), 175.0);
    }

    #[test]
    fn test_monotonic_and_floored() {
        let mut previous = 0.0;
        for step in 0..2000u64 {
            let size = step * MB / 10;
            let minutes = compute_timeout_minutes(size);
            assert!(minutes >= BASE_TIMEOUT_MINUTES);
            assert!(minutes >= previous, "not monotonic at {} bytes", size);
            previous = minutes;
        }
    }

    #[test]
    fn test_override_wins() {
        let policy = TimeoutPolicy::for_source(500 * MB, Some(1.0));
        assert!(policy.overridden);
        assert_eq!(policy.duration(), Duration::from_secs(60));

        let policy = TimeoutPolicy::for_source(2 * MB, None);
        assert!(!policy.overridden);
        assert_eq!(policy.duration(), Duration::from_secs(12 * 60));
    }
}
