/*! Value identifiers connecting the entities of the model.

Entities refer to each other through these identifiers and look the
current object up in the owning arena, never through stored references.
Identifiers compare by value, so clones and partial views of a model
remain mutually consistent.
*/

use derive_more::Display;

/// Identifier of an application.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "AppId:{}", _0)]
pub struct AppId(pub u32);

/// Version of an application; schedulable elements of different versions
/// never compare equal.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "v{}", _0)]
pub struct AppVersion(pub u32);

/// Identifier of a task within an application.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "AppId:{}-TaskId:{}", "app.0", task)]
pub struct TaskId {
    pub app: AppId,
    pub version: AppVersion,
    pub task: u32,
}

impl TaskId {
    pub fn new(app: AppId, version: AppVersion, task: u32) -> Self {
        TaskId { app, version, task }
    }
}

/// Identifier of a task link within an application.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "AppId:{}-SrcTaskId:{}-TrgTaskId:{}", "app.0", src, trg)]
pub struct TaskLinkId {
    pub app: AppId,
    pub version: AppVersion,
    pub link: u32,
    pub src: u32,
    pub trg: u32,
}

impl TaskLinkId {
    pub fn new(app: AppId, version: AppVersion, link: u32, src: u32, trg: u32) -> Self {
        TaskLinkId {
            app,
            version,
            link,
            src,
            trg,
        }
    }

    /// Identifier of the task at the source of the link.
    pub fn src_task(&self) -> TaskId {
        TaskId::new(self.app, self.version, self.src)
    }

    /// Identifier of the task the link points to.
    pub fn trg_task(&self) -> TaskId {
        TaskId::new(self.app, self.version, self.trg)
    }
}

/// Identifier of a schedulable element: a task or a task link.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElemId {
    #[display(fmt = "{}", _0)]
    Task(TaskId),
    #[display(fmt = "{}", _0)]
    Link(TaskLinkId),
}

impl ElemId {
    /// The application the element belongs to.
    pub fn app(&self) -> AppId {
        match self {
            ElemId::Task(id) => id.app,
            ElemId::Link(id) => id.app,
        }
    }
}

impl From<TaskId> for ElemId {
    fn from(id: TaskId) -> Self {
        ElemId::Task(id)
    }
}

impl From<TaskLinkId> for ElemId {
    fn from(id: TaskLinkId) -> Self {
        ElemId::Link(id)
    }
}

/// Identifier of a processing resource.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "ResId:{}", _0)]
pub struct ResourceId(pub u32);

/// Identifier of a communication resource.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "CResId:{}", _0)]
pub struct CommResourceId(pub u32);

/// Mapping target of a schedulable element: either kind of resource.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceRef {
    #[display(fmt = "{}", _0)]
    Proc(ResourceId),
    #[display(fmt = "{}", _0)]
    Comm(CommResourceId),
}

impl ResourceRef {
    pub fn as_proc(&self) -> Option<ResourceId> {
        match self {
            ResourceRef::Proc(id) => Some(*id),
            ResourceRef::Comm(_) => None,
        }
    }

    pub fn as_comm(&self) -> Option<CommResourceId> {
        match self {
            ResourceRef::Proc(_) => None,
            ResourceRef::Comm(id) => Some(*id),
        }
    }
}

impl From<ResourceId> for ResourceRef {
    fn from(id: ResourceId) -> Self {
        ResourceRef::Proc(id)
    }
}

impl From<CommResourceId> for ResourceRef {
    fn from(id: CommResourceId) -> Self {
        ResourceRef::Comm(id)
    }
}
