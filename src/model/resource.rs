use std::collections::{BTreeMap, BTreeSet};

use crate::extension::ExtensionSet;

use super::ident::{AppId, CommResourceId, ElemId, ResourceId};
use super::profile::{ResourceGroup, ResourceType};
use super::sched::Scheduler;

/// Per-application index of the schedulable elements mapped to a
/// resource. An application disappears from the index as soon as none of
/// its elements remain mapped here.
#[derive(Clone, Debug, Default)]
pub(crate) struct MappedElems {
    by_app: BTreeMap<AppId, BTreeSet<ElemId>>,
}

impl MappedElems {
    pub(crate) fn insert(&mut self, elem: ElemId) {
        self.by_app.entry(elem.app()).or_default().insert(elem);
    }

    pub(crate) fn remove(&mut self, elem: ElemId) {
        if let Some(elems) = self.by_app.get_mut(&elem.app()) {
            elems.remove(&elem);
            if elems.is_empty() {
                self.by_app.remove(&elem.app());
            }
        }
    }

    pub(crate) fn apps(&self) -> impl Iterator<Item = AppId> + '_ {
        self.by_app.keys().copied()
    }

    pub(crate) fn of_app(&self, app: AppId) -> impl Iterator<Item = ElemId> + '_ {
        self.by_app.get(&app).into_iter().flatten().copied()
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = ElemId> + '_ {
        self.by_app.values().flatten().copied()
    }

    pub(crate) fn clear(&mut self) {
        self.by_app.clear();
    }
}

/// A processing resource of the platform.
///
/// Processing resources neighbor only communication resources; the
/// neighbor relation is kept symmetric by
/// [SystemModel::add_link](super::SystemModel::add_link).
#[derive(Clone, Debug)]
pub struct Resource {
    id: ResourceId,
    name: String,
    res_type: ResourceType,
    res_group: ResourceGroup,
    scheduler: Scheduler,
    neighbors: BTreeSet<CommResourceId>,
    mapped: MappedElems,
    pub extensions: ExtensionSet,
}

impl Resource {
    pub fn new(id: ResourceId) -> Self {
        Resource::named(format!("ResId:{}", id.0), id)
    }

    pub fn named(name: String, id: ResourceId) -> Self {
        Resource {
            id,
            name,
            res_type: ResourceType::default(),
            res_group: ResourceGroup::default(),
            scheduler: Scheduler::default(),
            neighbors: BTreeSet::new(),
            mapped: MappedElems::default(),
            extensions: ExtensionSet::new(),
        }
    }

    pub fn with_type(mut self, res_type: ResourceType, res_group: ResourceGroup) -> Self {
        self.res_type = res_type;
        self.res_group = res_group;
        self
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn res_type(&self) -> ResourceType {
        self.res_type
    }

    pub fn res_group(&self) -> ResourceGroup {
        self.res_group
    }

    pub fn scheduler(&self) -> Scheduler {
        self.scheduler
    }

    pub fn set_scheduler(&mut self, scheduler: Scheduler) {
        self.scheduler = scheduler;
    }

    /// The communication resources this resource is connected to.
    pub fn neighbors(&self) -> impl Iterator<Item = CommResourceId> + '_ {
        self.neighbors.iter().copied()
    }

    /// Applications with at least one element mapped here.
    pub fn mapped_apps(&self) -> impl Iterator<Item = AppId> + '_ {
        self.mapped.apps()
    }

    /// All schedulable elements mapped here.
    pub fn mapped_elems(&self) -> impl Iterator<Item = ElemId> + '_ {
        self.mapped.all()
    }

    /// The elements of one application mapped here.
    pub fn mapped_elems_of(&self, app: AppId) -> impl Iterator<Item = ElemId> + '_ {
        self.mapped.of_app(app)
    }

    pub(crate) fn link_neighbor(&mut self, comm: CommResourceId) {
        self.neighbors.insert(comm);
    }

    pub(crate) fn unlink_neighbor(&mut self, comm: CommResourceId) {
        self.neighbors.remove(&comm);
    }

    pub(crate) fn map_elem(&mut self, elem: ElemId) {
        self.mapped.insert(elem);
    }

    pub(crate) fn unmap_elem(&mut self, elem: ElemId) {
        self.mapped.remove(elem);
    }

    pub(crate) fn clear_mapped(&mut self) {
        self.mapped.clear();
    }

    pub(crate) fn clear_neighbors(&mut self) {
        self.neighbors.clear();
    }
}

/// A communication resource (bus, network segment) of the platform.
///
/// Communication resources neighbor only processing resources.
#[derive(Clone, Debug)]
pub struct CommResource {
    id: CommResourceId,
    name: String,
    res_type: ResourceType,
    res_group: ResourceGroup,
    scheduler: Scheduler,
    neighbors: BTreeSet<ResourceId>,
    mapped: MappedElems,
    pub extensions: ExtensionSet,
}

impl CommResource {
    pub fn new(id: CommResourceId) -> Self {
        CommResource::named(format!("CResId:{}", id.0), id)
    }

    pub fn named(name: String, id: CommResourceId) -> Self {
        CommResource {
            id,
            name,
            res_type: ResourceType::default(),
            res_group: ResourceGroup::default(),
            scheduler: Scheduler::default(),
            neighbors: BTreeSet::new(),
            mapped: MappedElems::default(),
            extensions: ExtensionSet::new(),
        }
    }

    pub fn with_type(mut self, res_type: ResourceType, res_group: ResourceGroup) -> Self {
        self.res_type = res_type;
        self.res_group = res_group;
        self
    }

    pub fn id(&self) -> CommResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn res_type(&self) -> ResourceType {
        self.res_type
    }

    pub fn res_group(&self) -> ResourceGroup {
        self.res_group
    }

    pub fn scheduler(&self) -> Scheduler {
        self.scheduler
    }

    pub fn set_scheduler(&mut self, scheduler: Scheduler) {
        self.scheduler = scheduler;
    }

    /// The processing resources this communication resource connects.
    pub fn neighbors(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.neighbors.iter().copied()
    }

    /// Applications with at least one element mapped here.
    pub fn mapped_apps(&self) -> impl Iterator<Item = AppId> + '_ {
        self.mapped.apps()
    }

    /// All schedulable elements mapped here.
    pub fn mapped_elems(&self) -> impl Iterator<Item = ElemId> + '_ {
        self.mapped.all()
    }

    /// The elements of one application mapped here.
    pub fn mapped_elems_of(&self, app: AppId) -> impl Iterator<Item = ElemId> + '_ {
        self.mapped.of_app(app)
    }

    pub(crate) fn link_neighbor(&mut self, res: ResourceId) {
        self.neighbors.insert(res);
    }

    pub(crate) fn unlink_neighbor(&mut self, res: ResourceId) {
        self.neighbors.remove(&res);
    }

    pub(crate) fn map_elem(&mut self, elem: ElemId) {
        self.mapped.insert(elem);
    }

    pub(crate) fn unmap_elem(&mut self, elem: ElemId) {
        self.mapped.remove(elem);
    }

    pub(crate) fn clear_mapped(&mut self) {
        self.mapped.clear();
    }

    pub(crate) fn clear_neighbors(&mut self) {
        self.neighbors.clear();
    }
}
