pub mod app;
pub mod camera;
pub mod input;
pub mod player;
pub mod portal;
pub mod renderer;
pub mod settings;
