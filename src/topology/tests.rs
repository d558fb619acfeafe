use crate::model::ident::{CommResourceId, ResourceId};
use crate::model::{CommResource, Resource, SystemModel};
use crate::tests::{line_platform, small_platform};
use crate::topology::{ResourceTopology, TopologyError, UNREACHABLE};

#[test]
fn distances_on_a_line() {
    // r0 - c0 - r1 - c1 - r2
    let model = line_platform();
    let topology = ResourceTopology::of_platform(&model);

    assert_eq!(topology.distance(ResourceId(0), ResourceId(0)), 0);
    assert_eq!(topology.distance(ResourceId(0), ResourceId(1)), 1);
    assert_eq!(topology.distance(ResourceId(0), ResourceId(2)), 2);
    assert_eq!(topology.distance(ResourceId(2), ResourceId(0)), 2);
}

#[test]
fn distance_is_symmetric() {
    let model = line_platform();
    let topology = ResourceTopology::of_platform(&model);
    for a in 0..3 {
        for b in 0..3 {
            assert_eq!(
                topology.distance(ResourceId(a), ResourceId(b)),
                topology.distance(ResourceId(b), ResourceId(a)),
            );
        }
    }
}

#[test]
fn unreachable_pairs_get_the_sentinel() {
    let mut model = line_platform();
    model.add_resource(Resource::new(ResourceId(9))).unwrap();
    let topology = ResourceTopology::of_platform(&model);
    assert_eq!(topology.distance(ResourceId(0), ResourceId(9)), UNREACHABLE);
    assert_eq!(topology.distance(ResourceId(9), ResourceId(9)), 0);
}

#[test]
fn shortcut_links_shorten_the_distance() {
    // line platform plus a direct bus between r0 and r2
    let mut model = line_platform();
    model
        .add_comm_resource(CommResource::new(CommResourceId(7)))
        .unwrap();
    model.add_link(ResourceId(0), CommResourceId(7)).unwrap();
    model.add_link(ResourceId(2), CommResourceId(7)).unwrap();

    let topology = ResourceTopology::of_platform(&model);
    assert_eq!(topology.distance(ResourceId(0), ResourceId(2)), 1);
}

#[test]
fn locality_expands_one_hop_per_round() {
    let model = line_platform();
    let topology = ResourceTopology::of_platform(&model);

    let ids = |set: &std::collections::BTreeSet<ResourceId>| -> Vec<u32> {
        set.iter().map(|r| r.0).collect()
    };

    assert_eq!(ids(&topology.locality_resources(ResourceId(0), 0)), vec![0]);
    assert_eq!(
        ids(&topology.locality_resources(ResourceId(0), 1)),
        vec![0, 1]
    );
    assert_eq!(
        ids(&topology.locality_resources(ResourceId(0), 2)),
        vec![0, 1, 2]
    );
    assert_eq!(
        ids(&topology.locality_resources(ResourceId(1), 1)),
        vec![0, 1, 2]
    );
}

#[test]
fn comm_resource_between_adjacent_resources() {
    let model = small_platform();
    let topology = ResourceTopology::of_platform(&model);
    assert_eq!(
        topology.comm_resource_between(ResourceId(0), ResourceId(1), 1),
        Ok(CommResourceId(0))
    );
}

#[test]
fn comm_resource_between_unconnected_resources_fails() {
    let model = line_platform();
    let topology = ResourceTopology::of_platform(&model);
    assert_eq!(
        topology.comm_resource_between(ResourceId(0), ResourceId(2), 1),
        Err(TopologyError::NoSharedComm(ResourceId(0), ResourceId(2)))
    );
}

#[test]
fn tie_break_between_parallel_buses_is_seeded() {
    // two resources bridged by two parallel buses
    let mut model = SystemModel::new();
    model.add_resource(Resource::new(ResourceId(0))).unwrap();
    model.add_resource(Resource::new(ResourceId(1))).unwrap();
    for c in 0..2 {
        model
            .add_comm_resource(CommResource::new(CommResourceId(c)))
            .unwrap();
        model.add_link(ResourceId(0), CommResourceId(c)).unwrap();
        model.add_link(ResourceId(1), CommResourceId(c)).unwrap();
    }
    let topology = ResourceTopology::of_platform(&model);

    let first = topology
        .comm_resource_between(ResourceId(0), ResourceId(1), 42)
        .unwrap();
    let second = topology
        .comm_resource_between(ResourceId(0), ResourceId(1), 42)
        .unwrap();
    assert_eq!(first, second);
    assert!(first == CommResourceId(0) || first == CommResourceId(1));
}

#[test]
fn topology_reports_its_size() {
    let model = line_platform();
    let topology = ResourceTopology::of_platform(&model);
    assert_eq!(topology.num_resources(), 3);
    assert_eq!(topology.num_comm_resources(), 2);
    assert!(topology.contains(ResourceId(1)));
    assert!(!topology.contains(ResourceId(9)));
    assert!(topology.contains_comm(CommResourceId(0)));
    assert!(!topology.contains_comm(CommResourceId(9)));
}
