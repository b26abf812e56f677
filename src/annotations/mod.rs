//! External attribute tables.
//!
//! Attributes that could not be declared on a type or member in source are staged in an
//! [`AnnotationTableBuilder`] and frozen into an immutable [`AnnotationTable`]. The table
//! is keyed per declaring type and stores exactly what was added, without inheritance or
//! native declarations; [`crate::projection`] merges it into the introspection surface.
//!
//! # Key Components
//!
//! - [`AnnotationTableBuilder`] - Single-writer staging area with validating `add_*` operations
//! - [`AnnotationTable`] - Frozen, thread-safe lookup from elements to attached attributes
//! - [`TypeAnnotations`] / [`MethodAnnotations`] - Persistent per-type and per-overload storage
//! - [`SimpleMemberKey`] / [`MethodKey`] / [`TypeIdentity`] - Element identity
//! - [`TypeComparer`] - Injectable identity strategy for declaring types
//! - [`Selector`] - Textual member selection
//!
//! # Identity
//!
//! Fields, properties and events are keyed by kind and name, methods and constructors by name
//! and parameter types, so overloads never share annotations. Declaring types are identified
//! through a [`TypeComparer`]; the default [`OpenGenericComparer`] makes every instantiation of
//! a generic type share the annotations of its definition.
//!
//! # Examples
//!
//! ```rust
//! use attrscope::annotations::AnnotationTableBuilder;
//! use attrscope::metadata::customattributes::{AttributeKind, CustomAttribute};
//! use attrscope::metadata::introspection::ElementRef;
//! use attrscope::metadata::typesystem::{CilPrimitiveKind, TypeBuilder, TypeRegistry};
//!
//! let registry = TypeRegistry::new("Sample");
//! let int32 = registry.get_primitive(CilPrimitiveKind::I4)?;
//! let container = TypeBuilder::class("Sample", "Container`1")
//!     .generic_params(&["T"])
//!     .build(&registry)?;
//! let of_int = registry.make_generic_instance(&container, &[int32])?;
//!
//! let tracked = AttributeKind::new("Sample", "TrackedAttribute").into_rc();
//! let mut builder = AnnotationTableBuilder::new();
//! builder.add_type_attributes(container.as_ref(), [CustomAttribute::new(&tracked).into_rc()])?;
//!
//! let table = builder.create_table();
//! assert_eq!(table.attributes_for(ElementRef::Type(of_int.as_ref())).len(), 1);
//! # Ok::<(), attrscope::Error>(())
//! ```

mod builder;
mod identity;
mod metadata;
pub mod selector;
mod table;

pub use builder::AnnotationTableBuilder;
pub use identity::{
    ExactComparer, MethodKey, OpenGenericComparer, SimpleMemberKey, TypeComparer, TypeIdentity,
};
pub use metadata::{AttributeList, MethodAnnotations, TypeAnnotations};
pub use selector::{Selection, Selector, SelectorSlot};
pub use table::AnnotationTable;
