pub mod event;
pub mod level;
pub mod loader;
pub mod step;
pub mod world;
