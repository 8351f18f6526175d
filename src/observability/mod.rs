pub mod metrics;
pub mod middleware;
pub mod tracing;

pub use self::metrics::{Metrics, MetricsError};
pub use self::middleware::{
    observability_middleware, BusinessDomain, BusinessTracingMiddleware,
    DatabaseTracingMiddleware, REQUEST_ID_HEADER,
};
pub use self::tracing::{
    get_current_trace_id, init_observability, shutdown_observability, ObservabilityError,
};
