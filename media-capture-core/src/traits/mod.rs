pub mod capture_source;
pub mod device_provider;
pub mod frame_processor;
pub mod preview_sink;
pub mod session_delegate;
