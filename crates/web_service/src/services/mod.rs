pub mod constraint_gateway;
pub mod mock_prices;
pub mod persistence_sink;
pub mod pipeline;

pub use constraint_gateway::ConstraintGateway;
pub use persistence_sink::PersistenceSink;
pub use pipeline::{
    policies, Generated, IdentityPolicy, OperationPolicy, PersistPolicy, Pipeline,
    PipelineSettings, PUBLIC_TRIPS_LIMIT,
};
