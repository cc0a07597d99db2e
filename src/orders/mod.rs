pub mod lifecycle;
pub mod status;
