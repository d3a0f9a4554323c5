//! A ready-made observation metadata type and merge policy.
//!
//! Most deployments supply their own metadata and [`MergePolicy`]; this
//! module ships one working pair so the crate is usable out of the box for
//! the motivating case - position reports about moving objects (vessels,
//! vehicles) identified inconsistently across feeds.
//!
//! [`Report`] is a UTC timestamp plus a scalar along-track position.
//! [`ReportPolicy`] orders metadata by recency, combines by keeping the
//! later report, and gates merges on the implied speed between the two
//! positions: two states whose reports would require impossibly fast
//! travel are different objects no matter how their identifiers agree.
//!
//! Identifier-key reliability delegates to `K: Ord`, the greater key being
//! the more reliable. This fits enum key types whose variant order encodes
//! trust (`Name < Callsign < Mmsi`).

use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::MergePolicy;
use crate::state::EntityState;

/// One timestamped position observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// When the observation was made.
    pub observed_at: DateTime<Utc>,
    /// Scalar along-track position, in metres.
    pub position: f64,
}

impl Report {
    /// Creates a report.
    #[must_use]
    pub fn new(observed_at: DateTime<Utc>, position: f64) -> Self {
        Self {
            observed_at,
            position,
        }
    }

    /// Speed (metres per second) implied by travelling between this
    /// report's position and `other`'s in the time between them.
    ///
    /// Symmetric in its arguments; elapsed time is clamped to at least one
    /// second so near-simultaneous reports imply a finite speed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn implied_speed(&self, other: &Report) -> f64 {
        let elapsed = (other.observed_at - self.observed_at)
            .num_seconds()
            .abs()
            .max(1);
        (other.position - self.position).abs() / elapsed as f64
    }
}

/// Recency-and-plausibility policy over [`Report`] metadata.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use chrono::DateTime;
/// use coalesce::{EntityState, InMemorySystem, Report, ReportPolicy, System};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// enum Key {
///     Name,
///     Mmsi,
/// }
///
/// let mut system = InMemorySystem::new(ReportPolicy::new(15.0));
/// let t0 = DateTime::from_timestamp(0, 0).unwrap();
/// system.merge(EntityState::new(
///     HashMap::from([(Key::Mmsi, "503123456".to_string())]),
///     Report::new(t0, 0.0),
/// ));
/// assert_eq!(system.len(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportPolicy {
    /// Maximum plausible speed in metres per second.
    pub max_speed: f64,
}

impl ReportPolicy {
    /// Creates a policy with the given speed ceiling.
    #[must_use]
    pub fn new(max_speed: f64) -> Self {
        Self { max_speed }
    }
}

impl<K, V> MergePolicy<K, V, Report> for ReportPolicy
where
    K: Ord + Eq + Hash,
{
    fn key_outranks(&self, a: &K, b: &K) -> bool {
        a > b
    }

    fn metadata_outranks(&self, a: &Report, b: &Report) -> bool {
        a.observed_at > b.observed_at
    }

    fn mergeable(&self, a: &EntityState<K, V, Report>, b: &EntityState<K, V, Report>) -> bool {
        a.metadata().implied_speed(b.metadata()) <= self.max_speed
    }

    fn combine(&self, a: &Report, b: &Report) -> Report {
        // Later report wins; the first argument wins a tie.
        if a.observed_at >= b.observed_at {
            *a
        } else {
            *b
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn implied_speed_is_symmetric() {
        let a = Report::new(at(0), 0.0);
        let b = Report::new(at(100), 500.0);
        assert!((a.implied_speed(&b) - 5.0).abs() < f64::EPSILON);
        assert!((b.implied_speed(&a) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn near_simultaneous_reports_clamp_to_one_second() {
        let a = Report::new(at(10), 0.0);
        let b = Report::new(at(10), 30.0);
        assert!((a.implied_speed(&b) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn recency_orders_metadata() {
        let policy = ReportPolicy::new(10.0);
        let early = Report::new(at(0), 0.0);
        let late = Report::new(at(5), 0.0);
        assert!(MergePolicy::<u8, (), _>::metadata_outranks(&policy, &late, &early));
        assert!(!MergePolicy::<u8, (), _>::metadata_outranks(&policy, &early, &late));
    }

    #[test]
    fn combine_keeps_later_report_first_wins_ties() {
        let policy = ReportPolicy::new(10.0);
        let early = Report::new(at(0), 1.0);
        let late = Report::new(at(5), 2.0);
        assert_eq!(MergePolicy::<u8, (), _>::combine(&policy, &early, &late), late);

        let tied = Report::new(at(5), 9.0);
        assert_eq!(MergePolicy::<u8, (), _>::combine(&policy, &late, &tied), late);
    }

    #[test]
    fn speed_gate_rejects_implausible_travel() {
        let policy = ReportPolicy::new(15.0);
        let a = EntityState::new(
            HashMap::from([(1u8, "x")]),
            Report::new(at(0), 0.0),
        );
        let b = EntityState::new(
            HashMap::from([(1u8, "x")]),
            Report::new(at(60), 50_000.0),
        );
        assert!(!policy.mergeable(&a, &b));

        let c = EntityState::new(
            HashMap::from([(1u8, "x")]),
            Report::new(at(60), 600.0),
        );
        assert!(policy.mergeable(&a, &c));
    }
}
