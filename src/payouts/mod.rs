pub mod status;
pub mod workflow;
