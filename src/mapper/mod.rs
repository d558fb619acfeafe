/*! Distance-weighted randomized placement of task chains.

The mapper assigns every task and task link of one application to the
platform described by a [ResourceTopology]. Its parameters control how
strongly tasks attract or repel each other, so generated systems can be
clustered (many tasks per resource) or spread out. Placement grows the
chain from both ends, keeping every candidate resource within the
topology distance the task graph implies: a resource cannot be reached
in fewer hops than the chain needs to get there.

Only chains are supported; task graphs with forks or joins are rejected
before any mutation. All randomness derives from the explicit seed, so
one seed reproduces one placement.
*/

use std::collections::BTreeMap;

use itertools::iproduct;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::model::ident::{AppId, ResourceId, ResourceRef, TaskId, TaskLinkId};
use crate::model::{ModelError, SystemModel, Task, TaskLink};
use crate::topology::{ResourceTopology, TopologyError, UNREACHABLE};

mod selection;

#[cfg(test)]
mod tests;

use selection::MassTree;

/// Base weight each candidate resource starts from before the
/// multiplicative affinity factors are applied.
const BASE_MASS: u64 = 10_000;

/// Tunable attraction/repulsion factors of the placement heuristic.
///
/// All factors multiply a candidate's selection weight; the weight never
/// drops below 1, so no candidate is locked out entirely.
#[derive(Clone, Copy, Debug)]
pub struct MapperParams {
    /// Per-hop decay for the far-end placement: a resource at distance d
    /// from the chain's first resource keeps `res_dist_decay^d` of the
    /// base weight. Values below 1.0 favor close placements, values
    /// above 1.0 push the chain's far end outward.
    pub res_dist_decay: f64,
    /// Weight multiplier for a candidate already hosting the task's
    /// direct predecessor.
    pub predecessor_affinity: f64,
    /// Weight multiplier for a candidate already hosting the task's
    /// direct successor.
    pub successor_affinity: f64,
    /// Weight multiplier per other task of the same application already
    /// hosted by the candidate; applied only when neither predecessor
    /// nor successor is already co-located there.
    pub same_app_affinity: f64,
}

impl Default for MapperParams {
    /// Neutral factors: placement is constrained by feasibility only.
    fn default() -> Self {
        MapperParams {
            res_dist_decay: 1.0,
            predecessor_affinity: 1.0,
            successor_affinity: 1.0,
            same_app_affinity: 1.0,
        }
    }
}

/// Error type of the mapping operation. Mapping fails without partial
/// mutation: either the whole application is placed or nothing is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("unknown application {0}")]
    UnknownApplication(AppId),
    #[error("application {0} has no tasks")]
    EmptyApplication(AppId),
    #[error("platform has no processing resources")]
    EmptyPlatform,
    #[error("task graph forks or joins at {0}; only chains can be mapped")]
    ForkedTaskGraph(TaskId),
    #[error("task graph of {0} is not a single chain")]
    NotAChain(AppId),
    #[error("no feasible resource for task {0}")]
    NoFeasibleResource(TaskId),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Assign every task and task link of `app` to the platform described
/// by `topology`, mutating the model's mapping state in place.
///
/// The topology must have been built from the model's current platform;
/// the caller is responsible for rebuilding it after platform edits.
/// Repeated runs with the same seed produce the same assignment.
pub fn map_application(
    model: &mut SystemModel,
    app: AppId,
    topology: &ResourceTopology,
    params: &MapperParams,
    seed: u64,
) -> Result<(), MapError> {
    let application = model
        .application(app)
        .ok_or(MapError::UnknownApplication(app))?;
    if application.tasks().next().is_none() {
        return Err(MapError::EmptyApplication(app));
    }
    for task in application.tasks() {
        if task.outgoing().len() > 1 || task.incoming().len() > 1 {
            return Err(MapError::ForkedTaskGraph(task.id()));
        }
    }

    // capture the (immutable) graph structure before placing anything
    let tasks: Vec<TaskId> = application.tasks().map(Task::id).collect();
    let succ: BTreeMap<TaskId, TaskId> = application
        .tasks()
        .filter_map(|t| t.outgoing().first().map(|l| (t.id(), l.trg_task())))
        .collect();
    let pred: BTreeMap<TaskId, TaskId> = application
        .tasks()
        .filter_map(|t| t.incoming().first().map(|l| (t.id(), l.src_task())))
        .collect();
    let links: Vec<TaskLinkId> = application.task_links().map(TaskLink::id).collect();
    let graph_dist: BTreeMap<(TaskId, TaskId), u32> = iproduct!(&tasks, &tasks)
        .map(|(&a, &b)| ((a, b), application.graph_distance(a, b)))
        .collect();
    let mut start_frontier = application.start_tasks();
    let mut end_frontier = application.end_tasks();

    let resources: Vec<ResourceId> = model.resources().map(|r| r.id()).collect();
    if resources.is_empty() {
        return Err(MapError::EmptyPlatform);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut placement: BTreeMap<TaskId, ResourceId> = BTreeMap::new();
    let mut mapped: Vec<TaskId> = Vec::new();

    // the first start task goes onto a uniformly random resource
    let first = *start_frontier.first().ok_or(MapError::NotAChain(app))?;
    let first_res = resources[rng.gen_range(0..resources.len())];
    placement.insert(first, first_res);
    mapped.push(first);
    start_frontier.retain(|t| *t != first);
    end_frontier.retain(|t| *t != first);
    if let Some(&s) = succ.get(&first) {
        start_frontier.push(s);
    }
    debug!("placed start task {} on {}", first, first_res);

    // the far end is placed next, weighted by distance decay, excluding
    // resources farther out than the task graph can reach
    if let Some(&end) = end_frontier.first() {
        let task_dist = graph_dist[&(end, first)];
        let candidates: Vec<ResourceId> = resources
            .iter()
            .copied()
            .filter(|r| topology.distance(first_res, *r) <= task_dist)
            .collect();
        if candidates.is_empty() {
            return Err(MapError::NoFeasibleResource(end));
        }
        let index = if candidates.len() == 1 {
            0
        } else {
            let mass: Vec<u64> = candidates
                .iter()
                .map(|r| decayed_mass(params.res_dist_decay, topology.distance(first_res, *r)))
                .collect();
            MassTree::new(&mass).pick(&mut rng)
        };
        let end_res = candidates[index];
        placement.insert(end, end_res);
        mapped.push(end);
        start_frontier.retain(|t| *t != end);
        end_frontier.retain(|t| *t != end);
        if let Some(&p) = pred.get(&end) {
            end_frontier.push(p);
        }
        debug!("placed end task {} on {}", end, end_res);
    }

    // grow inward, alternating between the two ends of the chain
    let mut from_start = true;
    while placement.len() < tasks.len() {
        start_frontier.retain(|t| !placement.contains_key(t));
        end_frontier.retain(|t| !placement.contains_key(t));
        let task = if from_start && !start_frontier.is_empty() {
            start_frontier[0]
        } else if !end_frontier.is_empty() {
            end_frontier[0]
        } else if !start_frontier.is_empty() {
            start_frontier[0]
        } else {
            return Err(MapError::NotAChain(app));
        };

        // feasibility: stay within the graph distance to every task
        // already placed
        let mut candidates = resources.clone();
        for &m in &mapped {
            let task_dist = graph_dist[&(task, m)];
            let mapped_res = placement[&m];
            candidates.retain(|r| topology.distance(mapped_res, *r) <= task_dist);
        }
        if candidates.is_empty() {
            return Err(MapError::NoFeasibleResource(task));
        }

        let index = if candidates.len() == 1 {
            0
        } else {
            let p = pred.get(&task).copied();
            let s = succ.get(&task).copied();
            let mass: Vec<u64> = candidates
                .iter()
                .map(|&res| {
                    let mut mass = BASE_MASS;
                    let mut adjacent_here = false;
                    if let Some(p) = p {
                        if placement.get(&p) == Some(&res) {
                            mass = scaled(mass, params.predecessor_affinity);
                            adjacent_here = true;
                        }
                    }
                    if let Some(s) = s {
                        if placement.get(&s) == Some(&res) {
                            mass = scaled(mass, params.successor_affinity);
                            adjacent_here = true;
                        }
                    }
                    // other co-located tasks count only when neither
                    // neighbor is already here, to avoid double-counting
                    if !adjacent_here {
                        for &other in &mapped {
                            if Some(other) == p || Some(other) == s {
                                continue;
                            }
                            if placement.get(&other) == Some(&res) {
                                mass = scaled(mass, params.same_app_affinity);
                            }
                        }
                    }
                    mass
                })
                .collect();
            MassTree::new(&mass).pick(&mut rng)
        };

        let res = candidates[index];
        placement.insert(task, res);
        mapped.push(task);
        if from_start {
            if let Some(&s) = succ.get(&task) {
                if !placement.contains_key(&s) {
                    start_frontier.push(s);
                }
            }
        } else if let Some(&p) = pred.get(&task) {
            if !placement.contains_key(&p) {
                end_frontier.push(p);
            }
        }
        start_frontier.retain(|t| *t != task);
        end_frontier.retain(|t| *t != task);
        from_start = !from_start;
        debug!("placed task {} on {}", task, res);
    }

    // place the links: a shared resource if the endpoints co-reside, a
    // connecting communication resource otherwise
    let mut link_placement: Vec<(TaskLinkId, ResourceRef)> = Vec::new();
    for &link in &links {
        let src_res = placement[&link.src_task()];
        let trg_res = placement[&link.trg_task()];
        if src_res == trg_res {
            link_placement.push((link, src_res.into()));
        } else {
            let comm = topology.comm_resource_between(src_res, trg_res, seed)?;
            link_placement.push((link, comm.into()));
        }
    }

    // all decisions made; commit the assignment to the model
    for (&task, &res) in &placement {
        model.map_task(task, res)?;
    }
    for (link, target) in link_placement {
        debug!("placed link {} on {}", link, target);
        model.map_task_link(link, target)?;
    }
    Ok(())
}

fn scaled(mass: u64, factor: f64) -> u64 {
    (((mass as f64) * factor) as u64).max(1)
}

fn decayed_mass(decay: f64, distance: u32) -> u64 {
    if distance == UNREACHABLE {
        return 1;
    }
    ((BASE_MASS as f64) * decay.powi(distance as i32)).max(1.0) as u64
}
