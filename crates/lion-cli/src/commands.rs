pub mod instruct;
pub mod log;
pub mod render;
