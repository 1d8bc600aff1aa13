//! Skyform - declarative provisioning graph with deferred outputs
//!
//! A stack is declared as a [`Graph`] of resources, lookups, provider
//! bindings and status watches whose inputs are literals or [`Deferred`]
//! outputs of other entries. The [`Engine`] then materializes it against
//! provider traits, one task per entry, in data-flow order.
//!
//! ```text
//! StackConfig ──► stack::declare_nginx_stack ──► Graph
//!                                                  │ Engine::materialize
//!                                                  ▼
//!                     CloudProvider / ClusterConnector ──► Deployment (records, exports, events)
//! ```

pub mod binding;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod event_log;
pub mod graph;
pub mod interner;
pub mod output;
pub mod provider;
pub mod resource;
pub mod stack;
pub mod util;

pub use binding::{BindingHandle, ProviderBinding, Target};
pub use config::{PollPolicy, StackConfig};
pub use credentials::{ConnectionDescriptor, CredentialBundle, CredentialResults};
pub use engine::{Deployment, Engine, NodeStatus};
pub use error::{FixSuggestion, SkyError};
pub use event_log::{Event, EventKind, EventLog};
pub use graph::{DependencyGraph, Graph};
pub use output::{Deferred, Dependencies, NodeId};
pub use resource::{Input, Resource, ResourceKind, ResourceOptions};
pub use stack::{declare_nginx_stack, StackInputs};
