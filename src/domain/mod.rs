// Domain layer: upstream payload shapes and the ports the adapters implement.

pub mod model;
pub mod ports;
