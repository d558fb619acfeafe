use crate::time::Duration;

/// The model of how often, and with what jitter, a schedulable element
/// is triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivationPattern {
    /// Periodic activation with bounded release jitter.
    PeriodicJitter { period: Duration, jitter: Duration },
    /// Purely event-driven activation without a timing model.
    Event,
}

impl ActivationPattern {
    /// Activation period; zero for patterns without one.
    pub fn period(&self) -> Duration {
        match self {
            ActivationPattern::PeriodicJitter { period, .. } => *period,
            ActivationPattern::Event => 0,
        }
    }

    /// Release jitter; zero for patterns without one.
    pub fn jitter(&self) -> Duration {
        match self {
            ActivationPattern::PeriodicJitter { jitter, .. } => *jitter,
            ActivationPattern::Event => 0,
        }
    }
}

/// Period/jitter/minimum-distance triple describing the event stream at
/// a schedulable element's boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TimingBehavior {
    pub period: Duration,
    pub jitter: Duration,
    /// Minimum distance between consecutive events.
    pub dmin: Duration,
}

impl TimingBehavior {
    pub fn new(period: Duration, jitter: Duration, dmin: Duration) -> Self {
        TimingBehavior {
            period,
            jitter,
            dmin,
        }
    }
}
