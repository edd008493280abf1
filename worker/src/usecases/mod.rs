pub mod deactivate_expired_subscriptions;
