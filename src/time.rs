/// This library uses a simple discrete time model for execution demands.
pub type Time = u64;

/// Syntactic sugar to give a hint that a time value denotes an
/// interval length (e.g., an execution time or an activation period).
pub type Duration = Time;

/// Measured or bounded end-to-end latencies are continuous values, as
/// reported back by external analysis tools.
pub type Latency = f64;
