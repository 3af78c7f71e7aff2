pub mod bulk;
pub mod classify;
pub mod cluster;
pub mod plugins;
