/*! The entity arena: platform resources, applications, and the mapping
between them.

[SystemModel] exclusively owns every entity; relations between entities
(neighbor links, mapped-to pointers, task-link endpoints) are stored as
value identifiers from [ident] and resolved through the owning arena.
The mapping operations on [SystemModel] are the only mutators of mapping
state and keep its three copies consistent: the application's assignment
map, the element's own mapped-to pointer, and the resource's
per-application element index.
*/

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::extension::ExtensionSet;
use crate::time::Latency;

pub mod ident;
pub mod profile;
pub mod sched;
pub mod timing;

mod application;
mod resource;
mod task;

pub use application::Application;
pub use resource::{CommResource, Resource};
pub use task::{Schedulable, Task, TaskLink};

use ident::{AppId, CommResourceId, ElemId, ResourceId, ResourceRef, TaskId, TaskLinkId};
use sched::Priority;


/// Structural errors of the entity arena. These are never silently
/// defaulted: every inconsistency surfaces at the call that discovered
/// it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown application {0}")]
    UnknownApplication(AppId),
    #[error("unknown task {0}")]
    UnknownTask(TaskId),
    #[error("unknown task link {0}")]
    UnknownTaskLink(TaskLinkId),
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),
    #[error("unknown communication resource {0}")]
    UnknownCommResource(CommResourceId),
    #[error("duplicate application {0}")]
    DuplicateApplication(AppId),
    #[error("duplicate resource {0}")]
    DuplicateResource(ResourceId),
    #[error("duplicate communication resource {0}")]
    DuplicateCommResource(CommResourceId),
    #[error("duplicate element {0}")]
    DuplicateElement(ElemId),
    #[error("task link {link} references task {task} which is not part of the application")]
    MissingEndpoint { link: TaskLinkId, task: TaskId },
    #[error("task link {link} does not connect to task {task}")]
    LinkNotConnected { link: TaskLinkId, task: TaskId },
    #[error("element {elem} belongs to a different application")]
    ForeignElement { elem: ElemId },
    #[error("profile index {index} out of range for {elem}")]
    ProfileOutOfRange { elem: ElemId, index: usize },
    #[error("element {0} is not mapped")]
    NotMapped(ElemId),
}

/// The system: the platform's resources, the applications mapped onto
/// them, and system-wide annotations.
///
/// A model is intended to be mutated by exactly one logical owner at a
/// time; cloning produces an independent copy sharing nothing with the
/// original except identifier values (and only clone-on-copy extensions
/// survive the clone).
#[derive(Clone, Debug, Default)]
pub struct SystemModel {
    resources: BTreeMap<ResourceId, Resource>,
    comm_resources: BTreeMap<CommResourceId, CommResource>,
    applications: BTreeMap<AppId, Application>,
    pub extensions: ExtensionSet,
}

impl SystemModel {
    pub fn new() -> Self {
        Self::default()
    }

    //-----------platform modification----------

    pub fn add_resource(&mut self, resource: Resource) -> Result<(), ModelError> {
        if self.resources.contains_key(&resource.id()) {
            return Err(ModelError::DuplicateResource(resource.id()));
        }
        self.resources.insert(resource.id(), resource);
        Ok(())
    }

    pub fn add_comm_resource(&mut self, comm: CommResource) -> Result<(), ModelError> {
        if self.comm_resources.contains_key(&comm.id()) {
            return Err(ModelError::DuplicateCommResource(comm.id()));
        }
        self.comm_resources.insert(comm.id(), comm);
        Ok(())
    }

    /// Remove a processing resource, detaching its neighbor links and
    /// unmapping every element mapped to it.
    pub fn remove_resource(&mut self, id: ResourceId) -> Option<Resource> {
        let resource = self.resources.remove(&id)?;
        for comm in resource.neighbors() {
            if let Some(c) = self.comm_resources.get_mut(&comm) {
                c.unlink_neighbor(id);
            }
        }
        let mapped: Vec<ElemId> = resource.mapped_elems().collect();
        for elem in mapped {
            self.clear_element_mapping(elem);
        }
        Some(resource)
    }

    /// Remove a communication resource, detaching its neighbor links and
    /// unmapping every element mapped to it.
    pub fn remove_comm_resource(&mut self, id: CommResourceId) -> Option<CommResource> {
        let comm = self.comm_resources.remove(&id)?;
        for res in comm.neighbors() {
            if let Some(r) = self.resources.get_mut(&res) {
                r.unlink_neighbor(id);
            }
        }
        let mapped: Vec<ElemId> = comm.mapped_elems().collect();
        for elem in mapped {
            self.clear_element_mapping(elem);
        }
        Some(comm)
    }

    /// Insert a link between a processing and a communication resource.
    /// The neighbor relation is symmetric: both sides are updated.
    pub fn add_link(&mut self, res: ResourceId, comm: CommResourceId) -> Result<(), ModelError> {
        let Some(r) = self.resources.get_mut(&res) else {
            return Err(ModelError::UnknownResource(res));
        };
        let Some(c) = self.comm_resources.get_mut(&comm) else {
            return Err(ModelError::UnknownCommResource(comm));
        };
        r.link_neighbor(comm);
        c.link_neighbor(res);
        Ok(())
    }

    /// Remove a link between a processing and a communication resource,
    /// updating both sides.
    pub fn remove_link(&mut self, res: ResourceId, comm: CommResourceId) -> Result<(), ModelError> {
        let Some(r) = self.resources.get_mut(&res) else {
            return Err(ModelError::UnknownResource(res));
        };
        let Some(c) = self.comm_resources.get_mut(&comm) else {
            return Err(ModelError::UnknownCommResource(comm));
        };
        r.unlink_neighbor(comm);
        c.unlink_neighbor(res);
        Ok(())
    }

    /// Drop the whole platform; every mapped element becomes unmapped.
    pub fn clear_platform(&mut self) {
        for app in self.applications.values_mut() {
            let elems: Vec<ElemId> = app.assignment().keys().copied().collect();
            for elem in elems {
                match elem {
                    ElemId::Task(t) => app.set_task_mapping(t, None),
                    ElemId::Link(l) => app.set_link_mapping(l, None),
                }
                app.unassign(elem);
            }
        }
        self.resources.clear();
        self.comm_resources.clear();
    }

    //-----------application modification----------

    pub fn add_application(&mut self, app: Application) -> Result<(), ModelError> {
        if self.applications.contains_key(&app.id()) {
            return Err(ModelError::DuplicateApplication(app.id()));
        }
        self.applications.insert(app.id(), app);
        Ok(())
    }

    /// Remove an application, unmapping its elements from all resources.
    pub fn remove_application(&mut self, id: AppId) -> Option<Application> {
        let app = self.applications.remove(&id)?;
        for (&elem, &target) in app.assignment() {
            self.index_unmap(target, elem);
        }
        Some(app)
    }

    /// Drop all applications; the resources' element indexes are
    /// cleared along with them.
    pub fn clear_applications(&mut self) {
        for r in self.resources.values_mut() {
            r.clear_mapped();
        }
        for c in self.comm_resources.values_mut() {
            c.clear_mapped();
        }
        self.applications.clear();
    }

    //-----------mapping----------

    /// Map a task onto a processing resource. A previously mapped task
    /// is remapped.
    pub fn map_task(&mut self, task: TaskId, resource: ResourceId) -> Result<(), ModelError> {
        if !self.resources.contains_key(&resource) {
            return Err(ModelError::UnknownResource(resource));
        }
        let app = self
            .applications
            .get_mut(&task.app)
            .ok_or(ModelError::UnknownApplication(task.app))?;
        let previous = match app.task(task) {
            Some(t) => t.mapped_to(),
            None => return Err(ModelError::UnknownTask(task)),
        };
        app.set_task_mapping(task, Some(resource));
        app.assign(task.into(), resource.into());
        if let Some(prev) = previous {
            self.index_unmap(prev.into(), task.into());
        }
        self.index_map(resource.into(), task.into());
        Ok(())
    }

    /// Remove a task's mapping.
    pub fn unmap_task(&mut self, task: TaskId) -> Result<(), ModelError> {
        let app = self
            .applications
            .get_mut(&task.app)
            .ok_or(ModelError::UnknownApplication(task.app))?;
        let mapped = match app.task(task) {
            Some(t) => t.mapped_to(),
            None => return Err(ModelError::UnknownTask(task)),
        };
        let Some(resource) = mapped else {
            return Err(ModelError::NotMapped(task.into()));
        };
        app.set_task_mapping(task, None);
        app.unassign(task.into());
        self.index_unmap(resource.into(), task.into());
        Ok(())
    }

    /// Map a task link onto a resource or communication resource. A
    /// previously mapped link is remapped.
    pub fn map_task_link(
        &mut self,
        link: TaskLinkId,
        target: ResourceRef,
    ) -> Result<(), ModelError> {
        match target {
            ResourceRef::Proc(id) if !self.resources.contains_key(&id) => {
                return Err(ModelError::UnknownResource(id));
            }
            ResourceRef::Comm(id) if !self.comm_resources.contains_key(&id) => {
                return Err(ModelError::UnknownCommResource(id));
            }
            _ => {}
        }
        let app = self
            .applications
            .get_mut(&link.app)
            .ok_or(ModelError::UnknownApplication(link.app))?;
        let previous = match app.task_link(link) {
            Some(l) => l.mapped_to(),
            None => return Err(ModelError::UnknownTaskLink(link)),
        };
        app.set_link_mapping(link, Some(target));
        app.assign(link.into(), target);
        if let Some(prev) = previous {
            self.index_unmap(prev, link.into());
        }
        self.index_map(target, link.into());
        Ok(())
    }

    /// Remove a task link's mapping.
    pub fn unmap_task_link(&mut self, link: TaskLinkId) -> Result<(), ModelError> {
        let app = self
            .applications
            .get_mut(&link.app)
            .ok_or(ModelError::UnknownApplication(link.app))?;
        let mapped = match app.task_link(link) {
            Some(l) => l.mapped_to(),
            None => return Err(ModelError::UnknownTaskLink(link)),
        };
        let Some(target) = mapped else {
            return Err(ModelError::NotMapped(link.into()));
        };
        app.set_link_mapping(link, None);
        app.unassign(link.into());
        self.index_unmap(target, link.into());
        Ok(())
    }

    //-----------model query----------

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn resource_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(&id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn comm_resource(&self, id: CommResourceId) -> Option<&CommResource> {
        self.comm_resources.get(&id)
    }

    pub fn comm_resource_mut(&mut self, id: CommResourceId) -> Option<&mut CommResource> {
        self.comm_resources.get_mut(&id)
    }

    pub fn comm_resources(&self) -> impl Iterator<Item = &CommResource> {
        self.comm_resources.values()
    }

    pub fn application(&self, id: AppId) -> Option<&Application> {
        self.applications.get(&id)
    }

    pub fn application_mut(&mut self, id: AppId) -> Option<&mut Application> {
        self.applications.get_mut(&id)
    }

    pub fn applications(&self) -> impl Iterator<Item = &Application> {
        self.applications.values()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.applications.get(&id.app)?.task(id)
    }

    pub fn task_link(&self, id: TaskLinkId) -> Option<&TaskLink> {
        self.applications.get(&id.app)?.task_link(id)
    }

    /// The resource an element is currently mapped to.
    pub fn mapping(&self, elem: ElemId) -> Option<ResourceRef> {
        self.applications.get(&elem.app())?.mapping(elem)
    }

    /// Utilization of a resource: the mapped elements' worst-case
    /// execution times relative to their applications' activation
    /// periods (taken from each application's start task). Only elements
    /// of the matching kind count: tasks on processing resources, links
    /// on communication resources.
    pub fn load(&self, target: ResourceRef) -> Latency {
        let mapped: Vec<ElemId> = match target {
            ResourceRef::Proc(id) => self
                .resources
                .get(&id)
                .map(|r| r.mapped_elems().collect())
                .unwrap_or_default(),
            ResourceRef::Comm(id) => self
                .comm_resources
                .get(&id)
                .map(|c| c.mapped_elems().collect())
                .unwrap_or_default(),
        };
        let mut load = 0.0;
        for elem in mapped {
            let matches_kind = matches!(
                (target, elem),
                (ResourceRef::Proc(_), ElemId::Task(_)) | (ResourceRef::Comm(_), ElemId::Link(_))
            );
            if !matches_kind {
                continue;
            }
            let Some(app) = self.applications.get(&elem.app()) else {
                continue;
            };
            let period = app
                .start_tasks()
                .first()
                .and_then(|id| app.task(*id))
                .and_then(|t| t.active_profile())
                .map(|p| p.activation.period())
                .unwrap_or(u64::MAX);
            load += app.elem_wcet(elem) as Latency / period as Latency;
        }
        load
    }

    /// Reassign the priorities of the elements mapped to a resource as a
    /// seeded random permutation (1 = lowest). Only elements of the
    /// matching kind participate, as in [SystemModel::load].
    pub fn shuffle_priorities(&mut self, target: ResourceRef, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mapped: Vec<ElemId> = match target {
            ResourceRef::Proc(id) => self
                .resources
                .get(&id)
                .map(|r| {
                    r.mapped_elems()
                        .filter(|e| matches!(e, ElemId::Task(_)))
                        .collect()
                })
                .unwrap_or_default(),
            ResourceRef::Comm(id) => self
                .comm_resources
                .get(&id)
                .map(|c| {
                    c.mapped_elems()
                        .filter(|e| matches!(e, ElemId::Link(_)))
                        .collect()
                })
                .unwrap_or_default(),
        };

        // put every element at a random position, then number the list
        let mut order: Vec<ElemId> = Vec::with_capacity(mapped.len());
        for elem in mapped {
            if order.is_empty() {
                order.push(elem);
            } else {
                let index = rng.gen_range(0..order.len());
                order.insert(index, elem);
            }
        }
        for (i, elem) in order.iter().enumerate() {
            let prio = Priority((i + 1) as i32);
            let Some(app) = self.applications.get_mut(&elem.app()) else {
                continue;
            };
            match elem {
                ElemId::Task(id) => {
                    if let Some(task) = app.task_mut(*id) {
                        task.set_priority(prio);
                    }
                }
                ElemId::Link(id) => {
                    if let Some(link) = app.task_link_mut(*id) {
                        link.set_priority(prio);
                    }
                }
            }
        }
    }

    //-----------internal index maintenance----------

    fn index_map(&mut self, target: ResourceRef, elem: ElemId) {
        match target {
            ResourceRef::Proc(id) => {
                if let Some(r) = self.resources.get_mut(&id) {
                    r.map_elem(elem);
                }
            }
            ResourceRef::Comm(id) => {
                if let Some(c) = self.comm_resources.get_mut(&id) {
                    c.map_elem(elem);
                }
            }
        }
    }

    fn index_unmap(&mut self, target: ResourceRef, elem: ElemId) {
        match target {
            ResourceRef::Proc(id) => {
                if let Some(r) = self.resources.get_mut(&id) {
                    r.unmap_elem(elem);
                }
            }
            ResourceRef::Comm(id) => {
                if let Some(c) = self.comm_resources.get_mut(&id) {
                    c.unmap_elem(elem);
                }
            }
        }
    }

    fn clear_element_mapping(&mut self, elem: ElemId) {
        if let Some(app) = self.applications.get_mut(&elem.app()) {
            match elem {
                ElemId::Task(t) => app.set_task_mapping(t, None),
                ElemId::Link(l) => app.set_link_mapping(l, None),
            }
            app.unassign(elem);
        }
    }
}
