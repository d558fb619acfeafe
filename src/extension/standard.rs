/*! Extension types shared between the model and its external
collaborators.

These are the annotations that routinely travel through the generic
mechanism: results imported from an external schedulability analysis and
jitter requirements placed on element outputs. Each type carries its
conventional [AttachOptions] as an associated const, so callers attach
them consistently.
*/

use crate::model::timing::TimingBehavior;
use crate::time::Duration;

use super::{AttachOptions, Category, ExtensionData};

/// Category of annotations written back by analysis importers.
pub const ANALYSIS_RESULT: Category = Category("analysis-result");

/// Category of timing requirements attached to element outputs.
pub const TIMING_CONSTRAINT: Category = Category("timing-constraint");

/// Response-time analysis result for one schedulable element, as
/// reported by an external analysis tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Best-case response time.
    pub bcrt: Duration,
    /// Worst-case response time.
    pub wcrt: Duration,
    /// Event stream observed at the element's input.
    pub input_behavior: TimingBehavior,
    /// Event stream produced at the element's output.
    pub output_behavior: TimingBehavior,
}

impl AnalysisResult {
    /// Analysis results are derived data: a fresh import replaces the
    /// previous one, and clones of the entity start without them.
    pub const ATTACH: AttachOptions = AttachOptions {
        clone_on_copy: false,
        overwrite: true,
        ignore_if_present: false,
    };

    pub fn new(
        bcrt: Duration,
        wcrt: Duration,
        period: Duration,
        input_jitter: Duration,
        output_jitter: Duration,
    ) -> Self {
        AnalysisResult {
            bcrt,
            wcrt,
            input_behavior: TimingBehavior::new(period, input_jitter, 0),
            output_behavior: TimingBehavior::new(period, output_jitter, 0),
        }
    }
}

impl ExtensionData for AnalysisResult {
    const CATEGORY: Category = ANALYSIS_RESULT;
}

/// Requirement on the event stream at an element's output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JitterConstraint {
    /// The required output behavior.
    pub constraint: TimingBehavior,
}

impl JitterConstraint {
    /// Jitter constraints are requirements, not derived data: several may
    /// coexist, and they survive a structural clone.
    pub const ATTACH: AttachOptions = AttachOptions {
        clone_on_copy: true,
        overwrite: false,
        ignore_if_present: false,
    };

    pub fn new(constraint: TimingBehavior) -> Self {
        JitterConstraint { constraint }
    }
}

impl ExtensionData for JitterConstraint {
    const CATEGORY: Category = TIMING_CONSTRAINT;
}
