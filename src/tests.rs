use crate::mapper::{self, MapperParams};
use crate::model::ident::{
    AppId, AppVersion, CommResourceId, ElemId, ResourceId, ResourceRef, TaskId, TaskLinkId,
};
use crate::model::profile::Profile;
use crate::model::{Application, CommResource, Resource, SystemModel, Task, TaskLink};
use crate::topology::ResourceTopology;

pub fn task_id(app: u32, task: u32) -> TaskId {
    TaskId::new(AppId(app), AppVersion(0), task)
}

pub fn link_id(app: u32, link: u32, src: u32, trg: u32) -> TaskLinkId {
    TaskLinkId::new(AppId(app), AppVersion(0), link, src, trg)
}

/// Platform of two processing resources bridged by one communication
/// resource.
pub fn small_platform() -> SystemModel {
    let mut model = SystemModel::new();
    model.add_resource(Resource::new(ResourceId(0))).unwrap();
    model.add_resource(Resource::new(ResourceId(1))).unwrap();
    model
        .add_comm_resource(CommResource::new(CommResourceId(0)))
        .unwrap();
    model.add_link(ResourceId(0), CommResourceId(0)).unwrap();
    model.add_link(ResourceId(1), CommResourceId(0)).unwrap();
    model
}

/// Line platform: r0 - c0 - r1 - c1 - r2.
pub fn line_platform() -> SystemModel {
    let mut model = SystemModel::new();
    for r in 0..3 {
        model.add_resource(Resource::new(ResourceId(r))).unwrap();
    }
    for c in 0..2 {
        model
            .add_comm_resource(CommResource::new(CommResourceId(c)))
            .unwrap();
    }
    model.add_link(ResourceId(0), CommResourceId(0)).unwrap();
    model.add_link(ResourceId(1), CommResourceId(0)).unwrap();
    model.add_link(ResourceId(1), CommResourceId(1)).unwrap();
    model.add_link(ResourceId(2), CommResourceId(1)).unwrap();
    model
}

/// Chain application `t0 -> t1 -> ... -> t(n-1)` with periodic profiles.
pub fn chain_app(app: u32, n: u32) -> Application {
    let mut application = Application::new(AppId(app), AppVersion(0));
    for t in 0..n {
        let mut task = Task::new(task_id(app, t));
        task.add_profile(Profile::periodic(1, 2 + t as u64, 100, 0));
        application.add_task(task).unwrap();
    }
    for t in 0..n.saturating_sub(1) {
        let mut link = TaskLink::new(link_id(app, t, t, t + 1));
        link.add_profile(Profile::periodic(1, 1, 100, 0));
        application.add_task_link(link).unwrap();
    }
    application
}

#[test]
fn round_trip_mapping_is_deterministic() {
    let build = |seed: u64| {
        let mut model = small_platform();
        model.add_application(chain_app(0, 2)).unwrap();
        let topology = ResourceTopology::of_platform(&model);
        mapper::map_application(&mut model, AppId(0), &topology, &MapperParams::default(), seed)
            .unwrap();
        model
            .application(AppId(0))
            .unwrap()
            .assignment()
            .clone()
    };

    let first = build(42);
    let second = build(42);
    assert_eq!(first, second);

    // another seed must still produce a complete, feasible assignment
    let other = build(7);
    assert_eq!(other.len(), first.len());
}

#[test]
fn mapped_chain_ends_to_end() {
    // generate platform -> application -> map -> constrain -> record
    let mut model = line_platform();
    model.add_application(chain_app(0, 3)).unwrap();
    let topology = ResourceTopology::of_platform(&model);
    mapper::map_application(&mut model, AppId(0), &topology, &MapperParams::default(), 42)
        .unwrap();

    let app = model.application_mut(AppId(0)).unwrap();
    let (start, end) = (task_id(0, 0), task_id(0, 2));
    app.declare_constraint(start, end, 40.0).unwrap();
    app.resolve_constraint_paths();
    app.create_element_constraints();

    let path = app
        .constraint(start, end)
        .unwrap()
        .paths()
        .next()
        .unwrap()
        .name()
        .to_string();
    app.constraint_mut(start, end)
        .unwrap()
        .record_latency(&path, 55.0)
        .unwrap();

    let constraint = app.constraint(start, end).unwrap();
    assert!(constraint.violated());
    assert_eq!(constraint.violation(), Some(15.0));

    // every element of the path saw the propagated value
    let resolved = constraint.path(&path).unwrap();
    assert_eq!(resolved.elements().len(), 5);
    for ec in resolved.element_constraints() {
        assert_eq!(ec.history().latest(), 55.0);
    }
}

#[test]
fn mapping_respects_graph_distances() {
    let mut model = line_platform();
    model.add_application(chain_app(0, 4)).unwrap();
    let topology = ResourceTopology::of_platform(&model);
    mapper::map_application(&mut model, AppId(0), &topology, &MapperParams::default(), 3)
        .unwrap();

    let app = model.application(AppId(0)).unwrap();
    let placed: Vec<(TaskId, ResourceId)> = app
        .tasks()
        .map(|t| (t.id(), t.mapped_to().unwrap()))
        .collect();
    for &(ta, ra) in &placed {
        for &(tb, rb) in &placed {
            assert!(
                topology.distance(ra, rb) <= app.graph_distance(ta, tb),
                "{} and {} are farther apart than their tasks",
                ra,
                rb
            );
        }
    }

    // links sit on the shared resource or on a medium adjacent to both
    for link in app.task_links() {
        let src_res = app.task(link.src_task()).unwrap().mapped_to().unwrap();
        let trg_res = app.task(link.trg_task()).unwrap().mapped_to().unwrap();
        match link.mapped_to().unwrap() {
            ResourceRef::Proc(r) => {
                assert_eq!(src_res, trg_res);
                assert_eq!(r, src_res);
            }
            ResourceRef::Comm(c) => {
                let comm = model.comm_resource(c).unwrap();
                let neighbors: Vec<ResourceId> = comm.neighbors().collect();
                assert!(neighbors.contains(&src_res));
                assert!(neighbors.contains(&trg_res));
            }
        }
    }
}

#[test]
fn resource_indexes_follow_the_assignment() {
    let mut model = small_platform();
    model.add_application(chain_app(0, 2)).unwrap();
    let topology = ResourceTopology::of_platform(&model);
    mapper::map_application(&mut model, AppId(0), &topology, &MapperParams::default(), 42)
        .unwrap();

    let mut indexed = 0;
    for r in model.resources() {
        indexed += r.mapped_elems().count();
    }
    for c in model.comm_resources() {
        indexed += c.mapped_elems().count();
    }
    // two tasks plus one link
    assert_eq!(indexed, 3);

    for r in model.resources() {
        for elem in r.mapped_elems() {
            assert_eq!(model.mapping(elem), Some(ResourceRef::Proc(r.id())));
            assert!(matches!(elem, ElemId::Task(_) | ElemId::Link(_)));
        }
    }
}
