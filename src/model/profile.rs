use crate::time::Duration;

use super::timing::ActivationPattern;

/// Tag for the kind of resource a profile applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceType(pub u32);

/// Tag for the group of resources a profile applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceGroup(pub u32);

/// A timing/resource-applicability variant of a schedulable element.
///
/// A task (or task link) may carry several profiles, e.g. one per
/// resource type it could execute on; exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Profile {
    /// Best-case execution (or transmission) time.
    pub bcet: Duration,
    /// Worst-case execution (or transmission) time.
    pub wcet: Duration,
    pub activation: ActivationPattern,
    /// The resource type this profile applies to.
    pub res_type: ResourceType,
    /// The resource group this profile applies to.
    pub res_group: ResourceGroup,
}

impl Profile {
    /// A profile applicable to the generic resource type and group.
    pub fn new(bcet: Duration, wcet: Duration, activation: ActivationPattern) -> Self {
        Profile {
            bcet,
            wcet,
            activation,
            res_type: ResourceType::default(),
            res_group: ResourceGroup::default(),
        }
    }

    /// Shorthand for a periodically activated profile.
    pub fn periodic(bcet: Duration, wcet: Duration, period: Duration, jitter: Duration) -> Self {
        Profile::new(bcet, wcet, ActivationPattern::PeriodicJitter { period, jitter })
    }
}
