// Domain layer: tabular model, metric entities and collaborator ports.

pub mod metric;
pub mod model;
pub mod ports;
