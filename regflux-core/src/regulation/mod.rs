pub mod attractor;
pub mod builder;
pub mod eval;
pub mod network;
pub mod transition;
pub mod translation;
