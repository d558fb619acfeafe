use std::cmp::Ordering;

use derive_more::Display;

use super::task::Schedulable;

/// Static scheduling priority of a schedulable element; larger values
/// take precedence.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "prio:{}", _0)]
pub struct Priority(pub i32);

/// The scheduling policy a resource arbitrates its elements with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Scheduler {
    /// Static-priority preemptive scheduling; mapped elements are
    /// expected to carry a [Priority].
    #[default]
    StaticPriorityPreemptive,
}

/// Order two schedulable elements by scheduling priority; the element
/// with the higher priority compares greater. Elements without an
/// assigned priority rank below all elements that have one.
pub fn cmp_by_priority<A, B>(a: &A, b: &B) -> Ordering
where
    A: Schedulable + ?Sized,
    B: Schedulable + ?Sized,
{
    match (a.priority(), b.priority()) {
        (Some(pa), Some(pb)) => pa.cmp(&pb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
