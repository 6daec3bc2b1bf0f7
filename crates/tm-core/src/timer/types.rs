use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// The timer lists of the wheel.
///
/// Every list has one fixed timeout, so appending at the tail keeps it sorted
/// by deadline and expiry only ever looks at the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerListId {
    /// Final-response timeout for non-INVITE requests and INVITEs without provisional
    Fr,
    /// Final-response timeout for INVITEs after a provisional reply
    FrInv,
    /// Grace period before a completed transaction is torn down
    Wait,
    /// Delayed free of a torn-down transaction
    Delete,
    RtT1To1,
    RtT1To2,
    RtT1To3,
    RtT2,
}

impl TimerListId {
    pub const ALL: [TimerListId; 8] = [
        TimerListId::Fr,
        TimerListId::FrInv,
        TimerListId::Wait,
        TimerListId::Delete,
        TimerListId::RtT1To1,
        TimerListId::RtT1To2,
        TimerListId::RtT1To3,
        TimerListId::RtT2,
    ];

    pub fn index(self) -> usize {
        match self {
            TimerListId::Fr => 0,
            TimerListId::FrInv => 1,
            TimerListId::Wait => 2,
            TimerListId::Delete => 3,
            TimerListId::RtT1To1 => 4,
            TimerListId::RtT1To2 => 5,
            TimerListId::RtT1To3 => 6,
            TimerListId::RtT2 => 7,
        }
    }

    /// The retransmission tier served by this list, if any
    pub fn retr_tier(self) -> Option<RetrTier> {
        match self {
            TimerListId::RtT1To1 => Some(RetrTier::T1To1),
            TimerListId::RtT1To2 => Some(RetrTier::T1To2),
            TimerListId::RtT1To3 => Some(RetrTier::T1To3),
            TimerListId::RtT2 => Some(RetrTier::T2),
            _ => None,
        }
    }

    pub fn timeout(self, settings: &TimerSettings) -> Duration {
        match self {
            TimerListId::Fr => settings.fr,
            TimerListId::FrInv => settings.fr_inv,
            TimerListId::Wait => settings.wait,
            TimerListId::Delete => settings.delete,
            other => match other.retr_tier() {
                Some(tier) => tier.interval(settings),
                None => settings.fr,
            },
        }
    }
}

impl fmt::Display for TimerListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerListId::Fr => "FR",
            TimerListId::FrInv => "FR_INV",
            TimerListId::Wait => "WAIT",
            TimerListId::Delete => "DELETE",
            TimerListId::RtT1To1 => "RT_T1_TO_1",
            TimerListId::RtT1To2 => "RT_T1_TO_2",
            TimerListId::RtT1To3 => "RT_T1_TO_3",
            TimerListId::RtT2 => "RT_T2",
        };
        f.write_str(name)
    }
}

/// Retransmission backoff tiers: T1, 2·T1, 4·T1, then T2 forever.
///
/// Intervals are capped at T2, so with `T1 <= T2` the sequence never
/// shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RetrTier {
    T1To1,
    T1To2,
    T1To3,
    T2,
}

impl RetrTier {
    pub fn next(self) -> RetrTier {
        match self {
            RetrTier::T1To1 => RetrTier::T1To2,
            RetrTier::T1To2 => RetrTier::T1To3,
            RetrTier::T1To3 | RetrTier::T2 => RetrTier::T2,
        }
    }

    pub fn list(self) -> TimerListId {
        match self {
            RetrTier::T1To1 => TimerListId::RtT1To1,
            RetrTier::T1To2 => TimerListId::RtT1To2,
            RetrTier::T1To3 => TimerListId::RtT1To3,
            RetrTier::T2 => TimerListId::RtT2,
        }
    }

    pub fn interval(self, settings: &TimerSettings) -> Duration {
        match self {
            RetrTier::T1To1 => settings.t1.min(settings.t2),
            RetrTier::T1To2 => (settings.t1 * 2).min(settings.t2),
            RetrTier::T1To3 => (settings.t1 * 4).min(settings.t2),
            RetrTier::T2 => settings.t2,
        }
    }
}

/// Timer durations used by the transaction layer.
///
/// Values are read from configuration as milliseconds.
///
/// ```
/// use std::time::Duration;
/// use sipr_tm_core::timer::TimerSettings;
///
/// let lab = TimerSettings {
///     t1: Duration::from_millis(100),
///     t2: Duration::from_millis(400),
///     fr: Duration::from_secs(4),
///     ..Default::default()
/// };
/// assert_eq!(lab.wait, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    /// **T1: RTT estimate (default 500 ms).** First retransmission interval.
    #[serde(with = "duration_ms")]
    pub t1: Duration,

    /// **T2: retransmission cap (default 4 s).** Interval once backoff saturates.
    #[serde(with = "duration_ms")]
    pub t2: Duration,

    /// **Final-response timeout (default 30 s).** How long a branch may go
    /// without any final reply.
    #[serde(with = "duration_ms")]
    pub fr: Duration,

    /// **INVITE final-response timeout (default 120 s).** Replaces `fr` once
    /// an INVITE branch has seen a provisional reply.
    #[serde(with = "duration_ms")]
    pub fr_inv: Duration,

    /// **Wait time (default 5 s).** Completed transactions stay matchable
    /// this long to absorb retransmissions.
    #[serde(with = "duration_ms")]
    pub wait: Duration,

    /// **Delete delay (default 2 s).** Retry period while a torn-down
    /// transaction is still referenced.
    #[serde(with = "duration_ms")]
    pub delete: Duration,

    /// **Tick (default 100 ms).** Period of the background timer task.
    #[serde(with = "duration_ms")]
    pub tick: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            t1: Duration::from_millis(500),
            t2: Duration::from_secs(4),
            fr: Duration::from_secs(30),
            fr_inv: Duration::from_secs(120),
            wait: Duration::from_secs(5),
            delete: Duration::from_secs(2),
            tick: Duration::from_millis(100),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_chain_saturates() {
        let mut tier = RetrTier::T1To1;
        let mut seen = vec![tier];
        for _ in 0..5 {
            tier = tier.next();
            seen.push(tier);
        }
        assert_eq!(
            seen,
            vec![
                RetrTier::T1To1,
                RetrTier::T1To2,
                RetrTier::T1To3,
                RetrTier::T2,
                RetrTier::T2,
                RetrTier::T2
            ]
        );
    }

    #[test]
    fn test_default_intervals() {
        let s = TimerSettings::default();
        assert_eq!(RetrTier::T1To1.interval(&s), Duration::from_millis(500));
        assert_eq!(RetrTier::T1To2.interval(&s), Duration::from_secs(1));
        assert_eq!(RetrTier::T1To3.interval(&s), Duration::from_secs(2));
        assert_eq!(RetrTier::T2.interval(&s), Duration::from_secs(4));
        assert_eq!(TimerListId::RtT1To3.timeout(&s), Duration::from_secs(2));
        assert_eq!(TimerListId::FrInv.timeout(&s), Duration::from_secs(120));
    }

    #[test]
    fn test_intervals_capped_by_t2() {
        let s = TimerSettings {
            t1: Duration::from_secs(1),
            t2: Duration::from_millis(1500),
            ..Default::default()
        };
        assert_eq!(RetrTier::T1To2.interval(&s), Duration::from_millis(1500));
        assert_eq!(RetrTier::T1To3.interval(&s), Duration::from_millis(1500));
    }

    #[test]
    fn test_list_indices_unique() {
        let mut idx: Vec<usize> = TimerListId::ALL.iter().map(|l| l.index()).collect();
        idx.sort();
        assert_eq!(idx, (0..8).collect::<Vec<_>>());
    }
}
