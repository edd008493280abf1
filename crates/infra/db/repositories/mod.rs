pub mod app_users;
pub mod group_members;
pub mod plans;
