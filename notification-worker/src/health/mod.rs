//! Search cluster liveness check.
//!
//! The worker does not query the search cluster; it only polls the cluster
//! health once at startup so operators can see in the logs whether the
//! dependency is reachable.

pub mod backoff;
pub mod monitor;
pub mod search;

pub use backoff::Backoff;
pub use monitor::DependencyHealthMonitor;
pub use search::{ClusterHealthProbe, ElasticsearchProbe, HealthStatus};
