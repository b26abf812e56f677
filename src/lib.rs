// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # attrscope
//!
//! External custom attributes for .NET-style type systems. `attrscope` lets you attach
//! attributes to types and members you cannot edit, keeps them in an immutable annotation
//! table, and overlays that table on an introspection model so attribute queries see native
//! and external declarations as one set, with the usual `Inherited` / `AllowMultiple` rules.
//!
//! ## Features
//!
//! - **🏷️ External annotations** - Attach attributes to types, fields, properties, events,
//!   methods, constructors, parameters and return values
//! - **🧬 Precise identity** - Overloads never share annotations; generic instantiations share
//!   the annotations of their definition
//! - **🔍 Transparent projection** - Wrapped elements behave like the originals at every
//!   navigation depth, only attribute queries change
//! - **⚡ Caching** - Optional decorator sharing wrapper instances and memoizing query results
//! - **🧵 Thread safety** - Frozen tables, overlays and caches are `Send + Sync`
//!
//! ## Quick Start
//!
//! ```rust
//! use attrscope::prelude::*;
//!
//! let registry = TypeRegistry::new("Shop");
//! let string = registry.get_primitive(CilPrimitiveKind::String)?;
//! let customer = TypeBuilder::class("Shop", "Customer").build(&registry)?;
//! PropertyBuilder::new("Name", &string).setter().build(&customer)?;
//!
//! let required = AttributeKind::new("Shop", "RequiredAttribute").into_rc();
//!
//! let mut builder = AnnotationTableBuilder::new();
//! builder.add_property_attributes(
//!     customer.as_ref(),
//!     "Name",
//!     [CustomAttribute::new(&required).into_rc()],
//! )?;
//!
//! let projector = CachingProjector::new(builder.create_table());
//! let projected = projector.project_type(customer.clone());
//! let name = projected.property("Name").expect("declared above");
//! assert!(name.is_defined(&required, true));
//! # Ok::<(), attrscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - Attribute model, introspection capabilities and an in-memory type system
//! - [`annotations`] - Identity model, table builder and the frozen annotation table
//! - [`projection`] - Overlay wrappers and the caching decorator
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result<T>`]. Only the builder and the reference type system
//! fail; a failed builder call leaves the builder unchanged. Query paths never fail.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and installs no logger.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use attrscope::prelude::*;
///
/// let registry = TypeRegistry::new("Sample");
/// let table = AnnotationTableBuilder::new().create_table();
/// let overlay = AttributeOverlay::new(table);
/// let object = registry.get_primitive(CilPrimitiveKind::Object)?;
/// assert!(overlay.project_type(object).custom_attributes(true).is_empty());
/// # Ok::<(), attrscope::Error>(())
/// ```
pub mod prelude;

/// Program-element model: attributes, introspection capabilities and the reference type system
pub mod metadata;

/// Building and querying external annotation tables
pub mod annotations;

/// Overlaying annotation tables on the introspection surface
pub mod projection;

/// `attrscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `attrscope` Error type
///
/// Raised by builder operations and the reference type system.
///
/// # Examples
///
/// ```rust
/// use attrscope::Error;
/// use attrscope::annotations::AnnotationTableBuilder;
/// use attrscope::metadata::typesystem::{TypeBuilder, TypeRegistry};
///
/// let registry = TypeRegistry::new("Sample");
/// let widget = TypeBuilder::class("Sample", "Widget").build(&registry)?;
///
/// let mut builder = AnnotationTableBuilder::new();
/// match builder.add_field_attributes(widget.as_ref(), "missing", []) {
///     Err(Error::MemberNotFound { member, .. }) => assert_eq!(member, "missing"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// # Ok::<(), attrscope::Error>(())
/// ```
pub use error::Error;
