// Domain layer: row models and ports. Nothing here touches the network or the filesystem.

pub mod model;
pub mod ports;
