use std::collections::{BTreeMap, BTreeSet};

use crate::constraint::{ConstraintError, Path, SysLatencyConstraint};
use crate::extension::standard::AnalysisResult;
use crate::extension::ExtensionSet;
use crate::time::{Duration, Latency};
use crate::topology::UNREACHABLE;

use super::ident::{AppId, AppVersion, ElemId, ResourceId, ResourceRef, TaskId, TaskLinkId};
use super::task::{Schedulable, Task, TaskLink};
use super::ModelError;

/// An application: a task graph with timing profiles, its end-to-end
/// latency constraints, and the current task-to-resource assignment.
///
/// The assignment map is redundant with each element's own mapping
/// pointer; it is kept in sync by the mapping operations on
/// [SystemModel](super::SystemModel) and never mutated directly.
#[derive(Clone, Debug)]
pub struct Application {
    id: AppId,
    version: AppVersion,
    tasks: BTreeMap<u32, Task>,
    links: BTreeMap<(u32, u32), TaskLink>,
    constraints: BTreeMap<(u32, u32), SysLatencyConstraint>,
    assignment: BTreeMap<ElemId, ResourceRef>,
    pub extensions: ExtensionSet,
}

impl Application {
    pub fn new(id: AppId, version: AppVersion) -> Self {
        Application {
            id,
            version,
            tasks: BTreeMap::new(),
            links: BTreeMap::new(),
            constraints: BTreeMap::new(),
            assignment: BTreeMap::new(),
            extensions: ExtensionSet::new(),
        }
    }

    pub fn id(&self) -> AppId {
        self.id
    }

    pub fn version(&self) -> AppVersion {
        self.version
    }

    //-----------model modification----------

    /// Add a task; it must carry this application's id and version.
    pub fn add_task(&mut self, task: Task) -> Result<(), ModelError> {
        let id = task.id();
        if id.app != self.id || id.version != self.version {
            return Err(ModelError::ForeignElement { elem: id.into() });
        }
        if self.tasks.contains_key(&id.task) {
            return Err(ModelError::DuplicateElement(id.into()));
        }
        self.tasks.insert(id.task, task);
        Ok(())
    }

    /// Add a task link. Both endpoint tasks must already be part of this
    /// application; the link is registered with both of them.
    pub fn add_task_link(&mut self, link: TaskLink) -> Result<(), ModelError> {
        let id = link.id();
        if id.app != self.id || id.version != self.version {
            return Err(ModelError::ForeignElement { elem: id.into() });
        }
        for endpoint in [id.src_task(), id.trg_task()] {
            if !self.tasks.contains_key(&endpoint.task) {
                return Err(ModelError::MissingEndpoint {
                    link: id,
                    task: endpoint,
                });
            }
        }
        if self.links.contains_key(&(id.src, id.trg)) {
            return Err(ModelError::DuplicateElement(id.into()));
        }
        for endpoint in [id.src, id.trg] {
            if let Some(task) = self.tasks.get_mut(&endpoint) {
                task.register_link(id)?;
            }
        }
        self.links.insert((id.src, id.trg), link);
        Ok(())
    }

    /// Remove a task link, unregistering it from its endpoints.
    pub fn remove_task_link(&mut self, id: TaskLinkId) -> Option<TaskLink> {
        let link = self.links.remove(&(id.src, id.trg))?;
        for endpoint in [id.src, id.trg] {
            if let Some(task) = self.tasks.get_mut(&endpoint) {
                task.unregister_link(id);
            }
        }
        Some(link)
    }

    //-----------model query----------

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id.task).filter(|t| t.id() == id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id.task).filter(|t| t.id() == id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task_link(&self, id: TaskLinkId) -> Option<&TaskLink> {
        self.links.get(&(id.src, id.trg)).filter(|l| l.id() == id)
    }

    /// The link from `src` to `trg`, by task numbers.
    pub fn task_link_between(&self, src: u32, trg: u32) -> Option<&TaskLink> {
        self.links.get(&(src, trg))
    }

    pub fn task_link_mut(&mut self, id: TaskLinkId) -> Option<&mut TaskLink> {
        self.links.get_mut(&(id.src, id.trg)).filter(|l| l.id() == id)
    }

    pub fn task_links(&self) -> impl Iterator<Item = &TaskLink> {
        self.links.values()
    }

    /// Tasks without incoming links, i.e. the activation sources of the
    /// task graph.
    pub fn start_tasks(&self) -> Vec<TaskId> {
        self.tasks
            .values()
            .filter(|t| t.incoming().is_empty())
            .map(Task::id)
            .collect()
    }

    /// Tasks without outgoing links, i.e. the sinks of the task graph.
    pub fn end_tasks(&self) -> Vec<TaskId> {
        self.tasks
            .values()
            .filter(|t| t.outgoing().is_empty())
            .map(Task::id)
            .collect()
    }

    /// The current task-to-resource assignment.
    pub fn assignment(&self) -> &BTreeMap<ElemId, ResourceRef> {
        &self.assignment
    }

    /// The resource an element is mapped to, if it has been mapped.
    pub fn mapping(&self, elem: ElemId) -> Option<ResourceRef> {
        self.assignment.get(&elem).copied()
    }

    /// Shortest hop count between two tasks of this application,
    /// ignoring link direction; [UNREACHABLE] if no route connects them.
    pub fn graph_distance(&self, from: TaskId, to: TaskId) -> u32 {
        let mut visited = BTreeSet::new();
        self.graph_distance_from(from, to, &mut visited)
    }

    fn graph_distance_from(
        &self,
        from: TaskId,
        to: TaskId,
        visited: &mut BTreeSet<TaskId>,
    ) -> u32 {
        if from == to {
            return 0;
        }
        let Some(task) = self.task(from) else {
            return UNREACHABLE;
        };
        visited.insert(from);
        let mut min = UNREACHABLE;
        let hops = task
            .outgoing()
            .iter()
            .map(TaskLinkId::trg_task)
            .chain(task.incoming().iter().map(TaskLinkId::src_task));
        for next in hops {
            if !visited.contains(&next) {
                min = min.min(self.graph_distance_from(next, to, visited));
            }
        }
        visited.remove(&from);
        if min < UNREACHABLE {
            min + 1
        } else {
            min
        }
    }

    /// Worst-case execution time of an element's active profile; zero
    /// for unknown elements or elements without profiles.
    pub fn elem_wcet(&self, elem: ElemId) -> Duration {
        match elem {
            ElemId::Task(id) => self.task(id).map(|t| t.wcet()).unwrap_or(0),
            ElemId::Link(id) => self.task_link(id).map(|l| l.wcet()).unwrap_or(0),
        }
    }

    /// Worst-case response time annotated on an element by an external
    /// analysis import, if present.
    pub fn element_response_time(&self, elem: ElemId) -> Option<Duration> {
        let extensions = match elem {
            ElemId::Task(id) => &self.task(id)?.extensions,
            ElemId::Link(id) => &self.task_link(id)?.extensions,
        };
        extensions
            .first_by_type::<AnalysisResult>()
            .map(|r| r.wcrt)
    }

    //-----------constraints----------

    /// Declare an end-to-end latency requirement between two tasks of
    /// this application. Redeclaring a pair replaces the previous
    /// requirement, dropping its resolved paths.
    pub fn declare_constraint(
        &mut self,
        start: TaskId,
        end: TaskId,
        bound: Latency,
    ) -> Result<(), ModelError> {
        for id in [start, end] {
            if self.task(id).is_none() {
                return Err(ModelError::UnknownTask(id));
            }
        }
        self.constraints
            .insert((start.task, end.task), SysLatencyConstraint::new(start, end, bound));
        Ok(())
    }

    pub fn constraint(&self, start: TaskId, end: TaskId) -> Option<&SysLatencyConstraint> {
        self.constraints.get(&(start.task, end.task))
    }

    pub fn constraint_mut(
        &mut self,
        start: TaskId,
        end: TaskId,
    ) -> Option<&mut SysLatencyConstraint> {
        self.constraints.get_mut(&(start.task, end.task))
    }

    pub fn constraints(&self) -> impl Iterator<Item = &SysLatencyConstraint> {
        self.constraints.values()
    }

    /// Discover, for every declared constraint, the distinct routes from
    /// its start task to its end task through the task graph. Replaces
    /// previously resolved paths and resets measurement state.
    pub fn resolve_constraint_paths(&mut self) {
        let keys: Vec<(u32, u32)> = self.constraints.keys().copied().collect();
        for key in keys {
            let (start, end) = {
                let c = &self.constraints[&key];
                (c.start(), c.end())
            };
            let paths = self.enumerate_paths(start, end);
            if let Some(c) = self.constraints.get_mut(&key) {
                c.set_paths(paths);
            }
        }
    }

    /// Create the per-element sub-constraints of every resolved path.
    /// A distinct step from path resolution, since callers may want to
    /// inspect or prune paths first.
    pub fn create_element_constraints(&mut self) {
        for c in self.constraints.values_mut() {
            c.create_element_constraints();
        }
    }

    /// Tighten every measured constraint's bound to the latency actually
    /// achieved (the minimum of the current bound and the latest
    /// recorded value). Returns whether any bound changed.
    pub fn tighten_constraints(&mut self) -> bool {
        let mut changed = false;
        for c in self.constraints.values_mut() {
            if let Some(latest) = c.latency() {
                let tightened = c.bound().min(latest);
                if tightened != c.bound() {
                    c.set_bound(tightened);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Slack of `elem` on `path` at a point in history, as a fraction of
    /// the constraint's bound; negative values mean the element was
    /// violated at that point. The element's response time is taken from
    /// its attached [AnalysisResult].
    pub fn slack_percentage(
        &self,
        start: TaskId,
        end: TaskId,
        path: &str,
        elem: ElemId,
        history: usize,
    ) -> Result<Latency, ConstraintError> {
        let constraint = self
            .constraint(start, end)
            .ok_or(ConstraintError::UnknownConstraint { start, end })?;
        let response_time = self
            .element_response_time(elem)
            .ok_or(ConstraintError::MissingAnalysisResult(elem))?;
        constraint.slack_percentage(path, elem, response_time as Latency, history)
    }

    fn enumerate_paths(&self, start: TaskId, end: TaskId) -> Vec<Path> {
        let mut found: Vec<Vec<ElemId>> = Vec::new();
        let mut trail: Vec<ElemId> = vec![start.into()];
        let mut visited = BTreeSet::from([start]);
        self.walk_paths(start, end, &mut trail, &mut visited, &mut found);
        found
            .into_iter()
            .enumerate()
            .map(|(i, elems)| {
                let sum_wcets = elems.iter().map(|e| self.elem_wcet(*e)).sum();
                Path::new(
                    format!("{}->{}#{}", start.task, end.task, i),
                    elems,
                    sum_wcets,
                )
            })
            .collect()
    }

    fn walk_paths(
        &self,
        current: TaskId,
        end: TaskId,
        trail: &mut Vec<ElemId>,
        visited: &mut BTreeSet<TaskId>,
        found: &mut Vec<Vec<ElemId>>,
    ) {
        if current == end {
            found.push(trail.clone());
            return;
        }
        let Some(task) = self.task(current) else {
            return;
        };
        for &link in task.outgoing() {
            let next = link.trg_task();
            if visited.contains(&next) {
                continue;
            }
            visited.insert(next);
            trail.push(link.into());
            trail.push(next.into());
            self.walk_paths(next, end, trail, visited, found);
            trail.pop();
            trail.pop();
            visited.remove(&next);
        }
    }

    //-----------assignment maintenance (SystemModel only)----------

    pub(crate) fn assign(&mut self, elem: ElemId, resource: ResourceRef) {
        self.assignment.insert(elem, resource);
    }

    pub(crate) fn unassign(&mut self, elem: ElemId) {
        self.assignment.remove(&elem);
    }

    pub(crate) fn set_task_mapping(&mut self, id: TaskId, resource: Option<ResourceId>) {
        if let Some(task) = self.task_mut(id) {
            task.set_mapped_to(resource);
        }
    }

    pub(crate) fn set_link_mapping(&mut self, id: TaskLinkId, resource: Option<ResourceRef>) {
        if let Some(link) = self.task_link_mut(id) {
            link.set_mapped_to(resource);
        }
    }
}
