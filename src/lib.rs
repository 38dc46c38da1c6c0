pub mod app;
pub mod attractor;
pub mod camera;
pub mod chapters;
pub mod config;
pub mod framing;
pub mod pipeline;
pub mod render;
pub mod sim;
