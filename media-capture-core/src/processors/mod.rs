pub mod digest;
pub mod discard;
pub mod level_meter;
pub mod preview;
