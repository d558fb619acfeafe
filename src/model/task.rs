use auto_impl::auto_impl;

use crate::extension::ExtensionSet;
use crate::time::Duration;

use super::ident::{AppId, ElemId, ResourceId, ResourceRef, TaskId, TaskLinkId};
use super::profile::Profile;
use super::sched::Priority;
use super::ModelError;

/// Common interface of the units that consume resource capacity: tasks
/// and task links.
#[auto_impl(&, Box, Rc)]
pub trait Schedulable {
    /// Stable value identifier of this element.
    fn ident(&self) -> ElemId;

    /// All profiles of this element.
    fn profiles(&self) -> &[Profile];

    /// The currently active profile, if the element has any profile.
    fn active_profile(&self) -> Option<&Profile>;

    /// The scheduling parameter, if one has been assigned.
    fn priority(&self) -> Option<Priority>;

    /// Worst-case execution (or transmission) time of the active
    /// profile; zero while no profile is attached.
    fn wcet(&self) -> Duration {
        self.active_profile().map(|p| p.wcet).unwrap_or(0)
    }

    /// The application this element belongs to.
    fn app(&self) -> AppId {
        self.ident().app()
    }
}

/// A task of an application's task graph.
///
/// Cloning a task duplicates its structure (profiles, link lists) but
/// keeps only the clone-on-copy subset of its extensions.
#[derive(Clone, Debug)]
pub struct Task {
    id: TaskId,
    name: String,
    profiles: Vec<Profile>,
    active: Option<usize>,
    priority: Option<Priority>,
    mapped_to: Option<ResourceId>,
    outgoing: Vec<TaskLinkId>,
    incoming: Vec<TaskLinkId>,
    pub extensions: ExtensionSet,
}

impl Task {
    pub fn new(id: TaskId) -> Self {
        Task::named(format!("App {} - Task {}", id.app.0, id.task), id)
    }

    pub fn named(name: String, id: TaskId) -> Self {
        Task {
            id,
            name,
            profiles: Vec::new(),
            active: None,
            priority: None,
            mapped_to: None,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            extensions: ExtensionSet::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a profile; the first profile added becomes the active one.
    pub fn add_profile(&mut self, profile: Profile) {
        self.profiles.push(profile);
        if self.active.is_none() {
            self.active = Some(0);
        }
    }

    /// Make the profile at `index` the active one.
    pub fn set_active_profile(&mut self, index: usize) -> Result<(), ModelError> {
        if index >= self.profiles.len() {
            return Err(ModelError::ProfileOutOfRange {
                elem: self.id.into(),
                index,
            });
        }
        self.active = Some(index);
        Ok(())
    }

    pub fn active_profile_index(&self) -> Option<usize> {
        self.active
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = Some(priority);
    }

    /// The resource this task is mapped to, if it has been mapped.
    pub fn mapped_to(&self) -> Option<ResourceId> {
        self.mapped_to
    }

    /// Links leaving this task.
    pub fn outgoing(&self) -> &[TaskLinkId] {
        &self.outgoing
    }

    /// Links entering this task.
    pub fn incoming(&self) -> &[TaskLinkId] {
        &self.incoming
    }

    pub(crate) fn set_mapped_to(&mut self, resource: Option<ResourceId>) {
        self.mapped_to = resource;
    }

    pub(crate) fn register_link(&mut self, link: TaskLinkId) -> Result<(), ModelError> {
        if link.src_task() == self.id {
            if !self.outgoing.contains(&link) {
                self.outgoing.push(link);
            }
            Ok(())
        } else if link.trg_task() == self.id {
            if !self.incoming.contains(&link) {
                self.incoming.push(link);
            }
            Ok(())
        } else {
            Err(ModelError::LinkNotConnected {
                link,
                task: self.id,
            })
        }
    }

    pub(crate) fn unregister_link(&mut self, link: TaskLinkId) {
        self.outgoing.retain(|l| *l != link);
        self.incoming.retain(|l| *l != link);
    }
}

impl Schedulable for Task {
    fn ident(&self) -> ElemId {
        self.id.into()
    }

    fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    fn active_profile(&self) -> Option<&Profile> {
        self.active.and_then(|i| self.profiles.get(i))
    }

    fn priority(&self) -> Option<Priority> {
        self.priority
    }
}

/// A directed link between two tasks of the same application.
///
/// A link consumes capacity of the medium it is mapped to: the shared
/// processing resource when both endpoints co-reside, a communication
/// resource otherwise. Its profiles model transmission times.
#[derive(Clone, Debug)]
pub struct TaskLink {
    id: TaskLinkId,
    name: String,
    profiles: Vec<Profile>,
    active: Option<usize>,
    priority: Option<Priority>,
    mapped_to: Option<ResourceRef>,
    pub extensions: ExtensionSet,
}

impl TaskLink {
    pub fn new(id: TaskLinkId) -> Self {
        TaskLink::named(format!("{} - {}", id.src, id.trg), id)
    }

    pub fn named(name: String, id: TaskLinkId) -> Self {
        TaskLink {
            id,
            name,
            profiles: Vec::new(),
            active: None,
            priority: None,
            mapped_to: None,
            extensions: ExtensionSet::new(),
        }
    }

    pub fn id(&self) -> TaskLinkId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the task at the source of the link.
    pub fn src_task(&self) -> TaskId {
        self.id.src_task()
    }

    /// Identifier of the task the link points to.
    pub fn trg_task(&self) -> TaskId {
        self.id.trg_task()
    }

    /// Add a profile; the first profile added becomes the active one.
    pub fn add_profile(&mut self, profile: Profile) {
        self.profiles.push(profile);
        if self.active.is_none() {
            self.active = Some(0);
        }
    }

    /// Make the profile at `index` the active one.
    pub fn set_active_profile(&mut self, index: usize) -> Result<(), ModelError> {
        if index >= self.profiles.len() {
            return Err(ModelError::ProfileOutOfRange {
                elem: self.id.into(),
                index,
            });
        }
        self.active = Some(index);
        Ok(())
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = Some(priority);
    }

    /// The resource or communication resource this link is mapped to.
    pub fn mapped_to(&self) -> Option<ResourceRef> {
        self.mapped_to
    }

    pub(crate) fn set_mapped_to(&mut self, resource: Option<ResourceRef>) {
        self.mapped_to = resource;
    }
}

impl Schedulable for TaskLink {
    fn ident(&self) -> ElemId {
        self.id.into()
    }

    fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    fn active_profile(&self) -> Option<&Profile> {
        self.active.and_then(|i| self.profiles.get(i))
    }

    fn priority(&self) -> Option<Priority> {
        self.priority
    }
}
