/*! Derived view of the platform graph with precomputed distances.

A [ResourceTopology] is built once from the platform's current neighbor
relation and answers distance, locality, and connecting-medium queries.
It is derived, not authoritative: after any edit to the platform's
resource or link set the caller must rebuild it, the topology does not
track later changes.

Every path through the platform alternates processing and communication
resources, so distances always advance two hops at a time and count
processing-resource hops only.
*/

use std::collections::{BTreeSet, HashMap};

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::model::ident::{CommResourceId, ResourceId};
use crate::model::SystemModel;

#[cfg(test)]
mod tests;

/// Sentinel distance of resource (or task) pairs with no connecting
/// route.
pub const UNREACHABLE: u32 = u32::MAX;

/// Error type of topology queries.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TopologyError {
    /// The two resources share no adjacent communication resource.
    #[error("no communication resource connects {0} and {1}")]
    NoSharedComm(ResourceId, ResourceId),
}

/// Bipartite adjacency of the platform (rows are communication
/// resources, columns are processing resources) plus the all-pairs
/// distance matrix over the processing resources.
#[derive(Clone, Debug)]
pub struct ResourceTopology {
    adj: Vec<Vec<bool>>,
    col_of: HashMap<ResourceId, usize>,
    proc_ids: Vec<ResourceId>,
    row_of: HashMap<CommResourceId, usize>,
    comm_ids: Vec<CommResourceId>,
    dist: Vec<Vec<u32>>,
}

impl ResourceTopology {
    /// Build the topology of the platform's current resource and link
    /// set.
    pub fn of_platform(model: &SystemModel) -> Self {
        let proc_ids: Vec<ResourceId> = model.resources().map(|r| r.id()).collect();
        let comm_ids: Vec<CommResourceId> = model.comm_resources().map(|c| c.id()).collect();
        let col_of: HashMap<ResourceId, usize> =
            proc_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let row_of: HashMap<CommResourceId, usize> =
            comm_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut adj = vec![vec![false; proc_ids.len()]; comm_ids.len()];
        for (row, comm) in model.comm_resources().enumerate() {
            for neighbor in comm.neighbors() {
                adj[row][col_of[&neighbor]] = true;
            }
        }

        let mut topology = ResourceTopology {
            adj,
            col_of,
            proc_ids,
            row_of,
            comm_ids,
            dist: Vec::new(),
        };
        topology.dist = topology.all_pairs_distances();
        debug!(
            "built topology: {} processing, {} communication resources",
            topology.proc_ids.len(),
            topology.comm_ids.len()
        );
        topology
    }

    fn all_pairs_distances(&self) -> Vec<Vec<u32>> {
        let n = self.proc_ids.len();
        let mut dist = vec![vec![UNREACHABLE; n]; n];
        let mut seen_proc = vec![false; n];
        let mut seen_comm = vec![false; self.comm_ids.len()];
        for i in 0..n {
            for j in i..n {
                let d = self.two_hop_distance(i, j, &mut seen_proc, &mut seen_comm);
                dist[i][j] = d;
                dist[j][i] = d;
            }
        }
        dist
    }

    /// Exhaustive depth-first search that always advances two hops
    /// (processing → communication → processing), skipping over the
    /// communication resource in between.
    fn two_hop_distance(
        &self,
        from: usize,
        to: usize,
        seen_proc: &mut Vec<bool>,
        seen_comm: &mut Vec<bool>,
    ) -> u32 {
        if from == to {
            return 0;
        }
        seen_proc[from] = true;
        let mut min = UNREACHABLE;
        for row in 0..self.comm_ids.len() {
            if self.adj[row][from] && !seen_comm[row] {
                seen_comm[row] = true;
                for next in 0..self.proc_ids.len() {
                    if self.adj[row][next] && !seen_proc[next] {
                        min = min.min(self.two_hop_distance(next, to, seen_proc, seen_comm));
                    }
                }
                seen_comm[row] = false;
            }
        }
        seen_proc[from] = false;
        if min < UNREACHABLE {
            min + 1
        } else {
            min
        }
    }

    /// Distance in processing-resource hops between two resources; zero
    /// for a resource and itself, [UNREACHABLE] for disconnected pairs.
    ///
    /// # Panics
    ///
    /// Panics if either resource was not part of the platform when the
    /// topology was built; querying a stale topology is a programming
    /// error.
    pub fn distance(&self, a: ResourceId, b: ResourceId) -> u32 {
        self.dist[self.col_of[&a]][self.col_of[&b]]
    }

    /// All processing resources within `max_distance` hops of
    /// `resource`, the resource itself included. Expands one hop per
    /// round over the adjacency rows, deduplicating as it goes.
    ///
    /// # Panics
    ///
    /// Panics if `resource` was not part of the platform when the
    /// topology was built.
    pub fn locality_resources(
        &self,
        resource: ResourceId,
        max_distance: u32,
    ) -> BTreeSet<ResourceId> {
        let start = self.col_of[&resource];
        let mut reached: BTreeSet<usize> = BTreeSet::from([start]);
        for _ in 0..max_distance {
            let mut next = reached.clone();
            for &col in &reached {
                for row in 0..self.comm_ids.len() {
                    if self.adj[row][col] {
                        for (other, connected) in self.adj[row].iter().enumerate() {
                            if *connected {
                                next.insert(other);
                            }
                        }
                    }
                }
            }
            reached = next;
        }
        reached.into_iter().map(|col| self.proc_ids[col]).collect()
    }

    /// A communication resource adjacent to both `a` and `b`. When
    /// several qualify, one is picked uniformly at random from the given
    /// seed, so repeated calls with the same seed return the same
    /// medium.
    ///
    /// # Panics
    ///
    /// Panics if either resource was not part of the platform when the
    /// topology was built.
    pub fn comm_resource_between(
        &self,
        a: ResourceId,
        b: ResourceId,
        seed: u64,
    ) -> Result<CommResourceId, TopologyError> {
        let (col_a, col_b) = (self.col_of[&a], self.col_of[&b]);
        let shared: Vec<CommResourceId> = (0..self.comm_ids.len())
            .filter(|&row| self.adj[row][col_a] && self.adj[row][col_b])
            .map(|row| self.comm_ids[row])
            .collect();
        match shared.len() {
            0 => Err(TopologyError::NoSharedComm(a, b)),
            1 => Ok(shared[0]),
            n => {
                let mut rng = StdRng::seed_from_u64(seed);
                let pick = rng.gen_range(0..n);
                trace!("{} comm resources between {} and {}, picked {}", n, a, b, shared[pick]);
                Ok(shared[pick])
            }
        }
    }

    /// Number of processing resources in the topology.
    pub fn num_resources(&self) -> usize {
        self.proc_ids.len()
    }

    /// Number of communication resources in the topology.
    pub fn num_comm_resources(&self) -> usize {
        self.comm_ids.len()
    }

    /// Whether the topology knows the given processing resource.
    pub fn contains(&self, resource: ResourceId) -> bool {
        self.col_of.contains_key(&resource)
    }

    /// Whether the topology knows the given communication resource.
    pub fn contains_comm(&self, comm: CommResourceId) -> bool {
        self.row_of.contains_key(&comm)
    }
}
