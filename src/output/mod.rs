//! Output Module - deferred values and their combinators
//!
//! - `dependencies`: node identities and dependency sets
//! - `deferred`: `Deferred<T>`, transforms and resolvers
//! - `combine`: fail-fast joins (`zip`, `zip3`, `all`)

mod combine;
mod deferred;
mod dependencies;

pub use combine::{all, zip, zip3};
pub use deferred::{Deferred, Resolution, Resolver};
pub use dependencies::{Dependencies, NodeId};
