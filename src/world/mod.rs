pub mod area;
pub mod map;
pub mod position;
pub mod state;
pub mod time;
pub mod viewport;
