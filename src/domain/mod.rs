// Domain layer: send jobs, outcomes, job records and the ports the engine depends on.

pub mod model;
pub mod ports;
