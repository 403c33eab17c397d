pub mod controller;
pub mod frame_slot;
pub mod infrastructure;
pub mod session_state;
