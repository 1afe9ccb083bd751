//! Data structures shared by the loader and the sampling engine.

pub mod profile;
pub mod route;
pub mod time;
