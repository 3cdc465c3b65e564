//! chartgen-registry - Artifact Registry
//!
//! A reactive table tracking the compile/error/loading status of each
//! generated artifact. Every mutation notifies subscribers synchronously so
//! presentation layers can bind without polling.
//!
//! # Example
//!
//! ```rust
//! use chartgen_registry::{ArtifactRegistry, ArtifactStatus};
//! use serde_json::{json, Value};
//!
//! let registry = ArtifactRegistry::new();
//! registry.register("c1", "export const C1 = ...", Value::Null);
//! registry.set_loading("c1", true).unwrap();
//! registry.set_compiled("c1", json!({ "module": "c1" })).unwrap();
//!
//! assert_eq!(registry.get("c1").unwrap().status(), ArtifactStatus::Compiled);
//! assert_eq!(registry.stats().ready, 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod artifact;
pub mod error;
pub mod event;
pub mod registry;

// Re-exports for convenience
pub use artifact::{ArtifactEntry, ArtifactStatus, RegistryStats};
pub use error::RegistryError;
pub use event::{ListenerId, RegistryEvent};
pub use registry::{ArtifactRegistry, ListenerHandle};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
