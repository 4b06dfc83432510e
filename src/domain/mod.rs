// Domain layer: core models and ports (interfaces). No external service
// dependencies; adapters live at the edges.

pub mod model;
pub mod ports;
