//! Core types and traits for the Lariat URL shortener.
//!
//! This crate provides the domain model shared by the storage, cache
//! and resolution-service crates: the [`Link`] entity, the short-code
//! [`Alphabet`], the reversible [`Codec`] used to obscure values at
//! rest, and the [`LinkStore`] / [`LinkCache`] seams.

pub mod alphabet;
pub mod cache;
pub mod codec;
pub mod error;
pub mod link;
pub mod store;

pub use alphabet::Alphabet;
pub use cache::LinkCache;
pub use codec::{Codec, ObfuscatingCodec};
pub use error::{CacheError, DecodeError, StoreError};
pub use link::{ActiveLink, CachedLink, Link, NewLink};
pub use store::LinkStore;
