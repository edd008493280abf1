pub mod creation_gate;
pub mod plans;
pub mod subscription_status;
pub mod usage_limits;
