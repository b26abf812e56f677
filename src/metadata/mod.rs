//! Program-element model shared by the annotation and projection layers.
//!
//! This module contains the vocabulary every other part of the crate is written against:
//! attribute instances and their usage policy, the object-safe introspection capabilities of
//! types and members, and a complete in-memory type system implementing them.
//!
//! # Key Components
//!
//! - [`customattributes`] - Attribute instances, kinds, usage policy and inheritance merging
//! - [`introspection`] - Capability traits for types, members, parameters and assemblies
//! - [`token`] - Member identity within an assembly
//! - [`typesystem`] - In-memory host implementing [`introspection`]
//!
//! # Examples
//!
//! ```rust
//! use attrscope::metadata::customattributes::{AttributeKind, CustomAttribute};
//! use attrscope::metadata::introspection::AttributeProvider;
//! use attrscope::metadata::typesystem::{TypeBuilder, TypeRegistry};
//!
//! let registry = TypeRegistry::new("Sample");
//! let serializable = AttributeKind::new("System", "SerializableAttribute").into_rc();
//!
//! let order = TypeBuilder::class("Sample", "Order")
//!     .attribute(CustomAttribute::new(&serializable).into_rc())
//!     .build(&registry)?;
//!
//! assert!(order.is_defined(&serializable, false));
//! # Ok::<(), attrscope::Error>(())
//! ```

/// Custom attribute representation and inheritance rules
pub mod customattributes;
/// Capability traits for program elements
pub mod introspection;
/// Metadata tokens identifying members
pub mod token;
/// In-memory type system implementing the introspection capabilities
pub mod typesystem;
