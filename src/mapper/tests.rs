use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::mapper::selection::MassTree;
use crate::mapper::{map_application, MapError, MapperParams};
use crate::model::ident::{AppId, ResourceId, TaskId};
use crate::model::{Application, Task, TaskLink};
use crate::tests::{chain_app, line_platform, link_id, small_platform, task_id};
use crate::topology::ResourceTopology;

fn clustered() -> MapperParams {
    MapperParams {
        res_dist_decay: 0.1,
        predecessor_affinity: 50.0,
        successor_affinity: 50.0,
        same_app_affinity: 2.0,
    }
}

#[test]
fn mass_tree_total_and_range() {
    let tree = MassTree::new(&[1, 2, 3, 4]);
    assert_eq!(tree.total(), 10);

    let mut rng = StdRng::seed_from_u64(0);
    for _ in 0..100 {
        assert!(tree.pick(&mut rng) < 4);
    }
}

#[test]
fn mass_tree_is_deterministic_under_a_seed() {
    let tree = MassTree::new(&[5, 5, 5, 5, 5]);
    let draw = |seed: u64| -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..20).map(|_| tree.pick(&mut rng)).collect()
    };
    assert_eq!(draw(42), draw(42));
}

#[test]
fn mass_tree_respects_the_weights() {
    // overwhelming mass on index 1 dominates the draws
    let tree = MassTree::new(&[1, 1_000_000]);
    let mut rng = StdRng::seed_from_u64(7);
    let hits = (0..200).filter(|_| tree.pick(&mut rng) == 1).count();
    assert!(hits > 190);

    // every index with nonzero mass stays reachable
    let tree = MassTree::new(&[1, 1, 1]);
    let mut rng = StdRng::seed_from_u64(7);
    let mut seen = [false; 3];
    for _ in 0..200 {
        seen[tree.pick(&mut rng)] = true;
    }
    assert_eq!(seen, [true, true, true]);
}

#[test]
fn mapping_is_complete_and_reproducible() {
    let run = |seed: u64| {
        let mut model = line_platform();
        model.add_application(chain_app(0, 3)).unwrap();
        let topology = ResourceTopology::of_platform(&model);
        map_application(&mut model, AppId(0), &topology, &MapperParams::default(), seed).unwrap();
        let app = model.application(AppId(0)).unwrap();
        assert!(app.tasks().all(|t| t.mapped_to().is_some()));
        assert!(app.task_links().all(|l| l.mapped_to().is_some()));
        app.assignment().clone()
    };
    assert_eq!(run(42), run(42));
    assert_eq!(run(1234).len(), 5);
}

#[test]
fn clustering_parameters_pull_the_chain_together() {
    let mut model = line_platform();
    model.add_application(chain_app(0, 3)).unwrap();
    let topology = ResourceTopology::of_platform(&model);
    map_application(&mut model, AppId(0), &topology, &clustered(), 9).unwrap();

    // strong affinities keep neighbors at distance <= 1 regardless of
    // where the chain starts
    let app = model.application(AppId(0)).unwrap();
    for link in app.task_links() {
        let a = app.task(link.src_task()).unwrap().mapped_to().unwrap();
        let b = app.task(link.trg_task()).unwrap().mapped_to().unwrap();
        assert!(topology.distance(a, b) <= 1);
    }
}

#[test]
fn forked_graphs_are_rejected_without_mutation() {
    let mut model = small_platform();
    let mut app = chain_app(0, 3);
    // add a second outgoing link at t0 -> fork
    app.add_task(Task::new(task_id(0, 7))).unwrap();
    app.add_task_link(TaskLink::new(link_id(0, 9, 0, 7))).unwrap();
    model.add_application(app).unwrap();
    let topology = ResourceTopology::of_platform(&model);

    let result = map_application(
        &mut model,
        AppId(0),
        &topology,
        &MapperParams::default(),
        42,
    );
    assert_eq!(result, Err(MapError::ForkedTaskGraph(task_id(0, 0))));
    let app = model.application(AppId(0)).unwrap();
    assert!(app.assignment().is_empty());
    assert!(app.tasks().all(|t| t.mapped_to().is_none()));
}

#[test]
fn empty_applications_are_rejected() {
    let mut model = small_platform();
    model
        .add_application(Application::new(AppId(0), crate::model::ident::AppVersion(0)))
        .unwrap();
    let topology = ResourceTopology::of_platform(&model);
    assert_eq!(
        map_application(&mut model, AppId(0), &topology, &MapperParams::default(), 1),
        Err(MapError::EmptyApplication(AppId(0)))
    );
}

#[test]
fn unknown_applications_are_rejected() {
    let mut model = small_platform();
    let topology = ResourceTopology::of_platform(&model);
    assert_eq!(
        map_application(&mut model, AppId(5), &topology, &MapperParams::default(), 1),
        Err(MapError::UnknownApplication(AppId(5)))
    );
}

#[test]
fn platform_without_resources_is_rejected() {
    let mut model = crate::model::SystemModel::new();
    model.add_application(chain_app(0, 2)).unwrap();
    let topology = ResourceTopology::of_platform(&model);
    assert_eq!(
        map_application(&mut model, AppId(0), &topology, &MapperParams::default(), 1),
        Err(MapError::EmptyPlatform)
    );
}

#[test]
fn single_task_applications_map_anywhere() {
    let mut model = small_platform();
    model.add_application(chain_app(0, 1)).unwrap();
    let topology = ResourceTopology::of_platform(&model);
    map_application(&mut model, AppId(0), &topology, &MapperParams::default(), 3).unwrap();
    let app = model.application(AppId(0)).unwrap();
    assert!(app.task(task_id(0, 0)).unwrap().mapped_to().is_some());
}

#[test]
fn long_chains_fill_alternating_from_both_ends() {
    let mut model = line_platform();
    model.add_application(chain_app(0, 6)).unwrap();
    let topology = ResourceTopology::of_platform(&model);
    map_application(&mut model, AppId(0), &topology, &MapperParams::default(), 5).unwrap();

    let app = model.application(AppId(0)).unwrap();
    let placed: Vec<(TaskId, ResourceId)> = app
        .tasks()
        .map(|t| (t.id(), t.mapped_to().unwrap()))
        .collect();
    assert_eq!(placed.len(), 6);
    for &(ta, ra) in &placed {
        for &(tb, rb) in &placed {
            assert!(topology.distance(ra, rb) <= app.graph_distance(ta, tb));
        }
    }
}
