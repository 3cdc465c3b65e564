//! chartgen-spec - UI specification model
//!
//! The structured, revisable description of a generated UI:
//! - Component trees with data-source bindings
//! - Declarative data-source and transform declarations
//! - Feedback changes and their application handlers
//! - Structural validation with enumerated reasons
//!
//! # Example
//!
//! ```rust
//! use chartgen_spec::{ComponentNode, DataSourceSpec, UiSpecification};
//!
//! let spec = UiSpecification::new("Vitals")
//!     .with_data_source(DataSourceSpec::new("obs-vitals", "Observation"))
//!     .with_component(
//!         ComponentNode::new("chart", "vitals-chart").with_data_source("obs-vitals"),
//!     );
//!
//! assert!(spec.validate().is_ok());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod error;
pub mod feedback;
pub mod node;
pub mod source;
pub mod spec;

// Re-exports for convenience
pub use error::{SpecError, ValidationError};
pub use feedback::{apply_changes, ChangeKind, FeedbackChange};
pub use node::ComponentNode;
pub use source::{
    AggregateFn, CustomTransform, DataSourceSpec, FilterOp, FilterPredicate, SortDirection,
    TransformOp, TransformPipeline,
};
pub use spec::UiSpecification;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
