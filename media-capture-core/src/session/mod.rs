pub mod capture_session;
pub mod input;
pub mod orchestrator;
