pub mod config;
pub mod geometry;
pub mod logging;
pub mod menu;
pub mod platform;
