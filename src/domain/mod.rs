pub mod arena;
pub mod entity;
pub mod geom;
pub mod grid;
pub mod physics;
pub mod player;
pub mod tile;
