pub mod console;
pub mod render;
pub mod sensor_feed;
