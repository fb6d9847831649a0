//! Link resolution service: orchestrates the code generator, capacity
//! tracker, link store and cache into the create / resolve / warmup
//! operations.

pub mod capacity;
pub mod error;
pub mod service;

pub use capacity::CapacityTracker;
pub use error::{CreateError, ResolveError};
pub use service::{CreateRequest, CreatedLink, ExpirationPolicy, ResolutionService};
