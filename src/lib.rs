/*! In-memory models of embedded real-time platforms and the applications
mapped onto them, for schedulability-analysis research.

The crate provides the representation that synthetic-testcase generators,
mapping heuristics, and external analysis tools read and annotate:

- a generic [extension] mechanism that attaches arbitrary typed side-data
  to any model entity,
- the entity arena in [model] ([model::SystemModel], [model::Application],
  tasks, task links, and platform resources connected by value
  identifiers),
- the derived [topology] with precomputed pairwise distances and locality
  queries,
- the distance-weighted randomized [mapper] that places a task chain onto
  a platform, and
- the [constraint] subsystem that derives per-element sub-constraints
  from end-to-end latency requirements and propagates measured latencies
  backward through a path.

All operations are synchronous, in-memory, and free of I/O; randomized
algorithms take an explicit seed. Serialization, rendering, and the
invocation of external analysis tools are the business of the crates
built on top of this one.
*/

pub mod constraint;
pub mod extension;
pub mod mapper;
pub mod model;
pub mod time;
pub mod topology;

#[cfg(test)]
mod tests;
