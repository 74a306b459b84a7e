pub mod lane;
pub mod queue_pair;
