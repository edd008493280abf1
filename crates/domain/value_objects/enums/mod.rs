pub mod membership_statuses;
pub mod plan_durations;
pub mod plan_names;
pub mod resource_kinds;
pub mod user_roles;
