pub mod clusters;
pub mod graph;
pub mod handlers;
