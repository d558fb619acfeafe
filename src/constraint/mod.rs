/*! End-to-end latency constraints and their propagation along paths.

A [SysLatencyConstraint] binds a start task, an end task, and a latency
bound. Its life cycle is explicit: after declaration, the routes between
the two tasks are discovered
([Application::resolve_constraint_paths](crate::model::Application::resolve_constraint_paths)),
then one [ElementLatencyConstraint] per path element is created, and
only then can latencies be recorded. A recorded value enters at the
path's last element and sweeps backward to the path start, one
assignment per element, so every element sees the latest end-to-end
latency of its path. Each element constraint keeps a short bounded
history of the values it has seen for trend inspection.
*/

use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::ident::{ElemId, TaskId};
use crate::time::{Duration, Latency};

mod history;

#[cfg(test)]
mod tests;

pub use history::{LatencyHistory, HISTORY_DEPTH};

/// Error type of the constraint subsystem. Skipping a life-cycle step
/// (recording against unresolved paths, reading history beyond its
/// depth) is reported, never silently absorbed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("unknown constraint {start} -> {end}")]
    UnknownConstraint { start: TaskId, end: TaskId },
    #[error("unknown path {0:?}")]
    UnknownPath(String),
    #[error("element constraints of path {0:?} have not been created")]
    ElementConstraintsMissing(String),
    #[error("element {0} is not part of the path")]
    ElementNotOnPath(ElemId),
    #[error("history index {index} exceeds depth {depth}")]
    HistoryOutOfRange { index: usize, depth: usize },
    #[error("no analysis result attached to {0}")]
    MissingAnalysisResult(ElemId),
}

/// Per-element sub-constraint of one path: the element, its neighbors
/// on the path, and the history of path latencies it has seen.
#[derive(Clone, Debug)]
pub struct ElementLatencyConstraint {
    element: ElemId,
    predecessor: Option<ElemId>,
    successor: Option<ElemId>,
    history: LatencyHistory,
}

impl ElementLatencyConstraint {
    fn new(element: ElemId, predecessor: Option<ElemId>, successor: Option<ElemId>) -> Self {
        ElementLatencyConstraint {
            element,
            predecessor,
            successor,
            history: LatencyHistory::new(),
        }
    }

    pub fn element(&self) -> ElemId {
        self.element
    }

    /// The element's predecessor on the path; `None` at the path start
    /// (the start propagates to nothing).
    pub fn predecessor(&self) -> Option<ElemId> {
        self.predecessor
    }

    /// The element's successor on the path; `None` at the path end.
    pub fn successor(&self) -> Option<ElemId> {
        self.successor
    }

    /// The recorded path latencies, newest first.
    pub fn history(&self) -> &LatencyHistory {
        &self.history
    }

    /// The path latency `history` steps in the past (0 = current).
    pub fn path_latency(&self, history: usize) -> Result<Latency, ConstraintError> {
        self.history.get(history)
    }

    /// Slack of the element at a point in history, as a fraction of
    /// `bound`: `(response_time - path_latency) / bound`. Negative
    /// values mean the element was violated at that point.
    pub fn slack_percentage(
        &self,
        response_time: Latency,
        bound: Latency,
        history: usize,
    ) -> Result<Latency, ConstraintError> {
        Ok((response_time - self.history.get(history)?) / bound)
    }

    fn record(&mut self, value: Latency) {
        self.history.record(value);
    }
}

/// One route from a constraint's start task to its end task: an ordered
/// sequence of schedulable elements plus the sum of their worst-case
/// execution times.
#[derive(Clone, Debug)]
pub struct Path {
    name: String,
    elements: Vec<ElemId>,
    sum_wcets: Duration,
    latency: Option<Latency>,
    element_constraints: Vec<ElementLatencyConstraint>,
}

impl Path {
    pub(crate) fn new(name: String, elements: Vec<ElemId>, sum_wcets: Duration) -> Self {
        Path {
            name,
            elements,
            sum_wcets,
            latency: None,
            element_constraints: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schedulable elements along this path, start to end.
    pub fn elements(&self) -> &[ElemId] {
        &self.elements
    }

    /// Sum of the worst-case execution times of all elements.
    pub fn sum_wcets(&self) -> Duration {
        self.sum_wcets
    }

    /// The latest recorded latency of this path.
    pub fn latency(&self) -> Option<Latency> {
        self.latency
    }

    /// The per-element sub-constraints; empty until created, then one
    /// per path element, in path order.
    pub fn element_constraints(&self) -> &[ElementLatencyConstraint] {
        &self.element_constraints
    }

    /// The sub-constraint of one element of this path.
    pub fn element_constraint(&self, element: ElemId) -> Option<&ElementLatencyConstraint> {
        self.element_constraints
            .iter()
            .find(|ec| ec.element() == element)
    }

    fn create_element_constraints(&mut self) {
        self.element_constraints = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, &elem)| {
                let predecessor = if i > 0 { Some(self.elements[i - 1]) } else { None };
                let successor = self.elements.get(i + 1).copied();
                ElementLatencyConstraint::new(elem, predecessor, successor)
            })
            .collect();
    }

    /// Record a measured latency: the value enters at the last element
    /// and propagates backward to the path start.
    fn record_latency(&mut self, value: Latency) -> Result<(), ConstraintError> {
        if self.element_constraints.is_empty() {
            return Err(ConstraintError::ElementConstraintsMissing(self.name.clone()));
        }
        self.latency = Some(value);
        for ec in self.element_constraints.iter_mut().rev() {
            ec.record(value);
        }
        Ok(())
    }
}

/// An end-to-end latency requirement between two tasks of one
/// application.
#[derive(Clone, Debug)]
pub struct SysLatencyConstraint {
    start: TaskId,
    end: TaskId,
    bound: Latency,
    latency: Option<Latency>,
    violated: bool,
    paths: BTreeMap<String, Path>,
}

impl SysLatencyConstraint {
    pub(crate) fn new(start: TaskId, end: TaskId, bound: Latency) -> Self {
        SysLatencyConstraint {
            start,
            end,
            bound,
            latency: None,
            violated: false,
            paths: BTreeMap::new(),
        }
    }

    pub fn start(&self) -> TaskId {
        self.start
    }

    pub fn end(&self) -> TaskId {
        self.end
    }

    /// The latency bound.
    pub fn bound(&self) -> Latency {
        self.bound
    }

    /// Change the bound; violation state is re-derived on the next
    /// recorded latency.
    pub fn set_bound(&mut self, bound: Latency) {
        self.bound = bound;
    }

    /// The latest recorded end-to-end latency, if any has been recorded.
    pub fn latency(&self) -> Option<Latency> {
        self.latency
    }

    /// Whether the latest recorded latency exceeded the bound.
    pub fn violated(&self) -> bool {
        self.violated
    }

    /// By how much the latest latency exceeds the bound; positive means
    /// violated. `None` before the first measurement.
    pub fn violation(&self) -> Option<Latency> {
        self.latency.map(|l| l - self.bound)
    }

    /// The resolved paths between start and end; empty until paths have
    /// been resolved (a legal, degenerate state).
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }

    pub fn path(&self, name: &str) -> Option<&Path> {
        self.paths.get(name)
    }

    /// Replace the resolved paths, resetting all measurement state.
    pub(crate) fn set_paths(&mut self, paths: Vec<Path>) {
        self.paths = paths.into_iter().map(|p| (p.name.clone(), p)).collect();
        self.latency = None;
        self.violated = false;
    }

    /// Create the per-element sub-constraints of every resolved path.
    pub fn create_element_constraints(&mut self) {
        for path in self.paths.values_mut() {
            path.create_element_constraints();
        }
    }

    /// Record a measured end-to-end latency for one path and propagate
    /// it backward through the path's element constraints. Recomputes
    /// the violation state from the new value.
    pub fn record_latency(&mut self, path: &str, value: Latency) -> Result<(), ConstraintError> {
        let p = self
            .paths
            .get_mut(path)
            .ok_or_else(|| ConstraintError::UnknownPath(path.to_string()))?;
        p.record_latency(value)?;
        self.latency = Some(value);
        self.violated = value > self.bound;
        Ok(())
    }

    /// Slack of one element of one path at a point in history, as a
    /// fraction of this constraint's bound.
    pub fn slack_percentage(
        &self,
        path: &str,
        element: ElemId,
        response_time: Latency,
        history: usize,
    ) -> Result<Latency, ConstraintError> {
        let p = self
            .path(path)
            .ok_or_else(|| ConstraintError::UnknownPath(path.to_string()))?;
        let ec = p
            .element_constraint(element)
            .ok_or(ConstraintError::ElementNotOnPath(element))?;
        ec.slack_percentage(response_time, self.bound, history)
    }

    /// Name of the constraint, derived from its endpoints.
    pub fn name(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}
