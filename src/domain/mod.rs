pub mod entity;
pub mod phase;
pub mod physics;
pub mod rules;
pub mod schedule;
pub mod teleport;
pub mod tile;
pub mod variables;
