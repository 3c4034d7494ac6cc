//! Reachability seam between the pipeline and the host routing engine

mod adapter;
mod oracle;

pub use adapter::ReachabilityAdapter;
pub use oracle::{ReachabilityOracle, RouteGeometry};
