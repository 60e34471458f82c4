// Domain layer: records that flow between pipeline stages and the ports
// (interfaces) the stages depend on.

pub mod model;
pub mod ports;
