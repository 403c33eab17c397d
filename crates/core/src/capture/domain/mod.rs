pub mod capture_gate;
pub mod frame_source;
