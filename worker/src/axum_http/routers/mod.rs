pub mod expired_subscriptions;
