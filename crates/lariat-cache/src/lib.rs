//! [`LinkCache`](lariat_core::LinkCache) implementations shared across
//! Lariat services.

pub mod moka;
pub mod redis;

pub use moka::MokaLinkCache;
pub use redis::RedisLinkCache;
