//! # attrscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the attrscope library. Import this module to get quick access to the builder, the
//! projections and the introspection traits their results are used through.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all attrscope operations
pub use crate::Error;

/// The result type used throughout attrscope
pub use crate::Result;

// ================================================================================================
// Attributes
// ================================================================================================

/// Attribute instances, kinds and usage policy
pub use crate::metadata::customattributes::{
    AttributeKind, AttributeKindRc, AttributeUsage, CustomAttribute, CustomAttributeArgument,
    CustomAttributeRc,
};

// ================================================================================================
// Introspection
// ================================================================================================

/// Capability traits implemented by host and projected elements
pub use crate::metadata::introspection::{
    AssemblyInfo, AttributeProvider, EventInfo, FieldInfo, MemberInfo, MethodInfo, ParameterInfo,
    PropertyInfo, TypeInfo,
};

/// Shared element handles and borrowed views
pub use crate::metadata::introspection::{
    AssemblyRc, ElementKind, ElementRef, EventRc, FieldRc, MemberRef, MethodRc, ParameterRc,
    PropertyRc, TypeHandle, TypeRc,
};

/// Metadata token type identifying members
pub use crate::metadata::token::Token;

// ================================================================================================
// Type System
// ================================================================================================

/// In-memory type system and its declaration builders
pub use crate::metadata::typesystem::{
    CilPrimitiveKind, CilType, CilTypeRc, EventBuilder, FieldBuilder, MethodBuilder,
    MethodModifiers, ParamType, PropertyBuilder, TypeBuilder, TypeRegistry,
};

// ================================================================================================
// Annotations
// ================================================================================================

/// Table construction and lookup
pub use crate::annotations::{AnnotationTable, AnnotationTableBuilder};

/// Element identity and type comparison strategies
pub use crate::annotations::{
    ExactComparer, MethodKey, OpenGenericComparer, SimpleMemberKey, TypeComparer, TypeIdentity,
};

/// Textual member selection
pub use crate::annotations::{Selection, Selector};

// ================================================================================================
// Projection
// ================================================================================================

/// Overlay, caching decorator and their front door
pub use crate::projection::{AttributeOverlay, CachingProjector, Projection, Projector};
