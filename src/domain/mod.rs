// Domain layer: the form document, wire types and the transport ports.

pub mod model;
pub mod ports;
