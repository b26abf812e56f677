//! Built-in runtime types pre-registered in every [`crate::metadata::typesystem::TypeRegistry`].
//!
//! Primitives occupy the first `TypeDef` rows of a registry, in the order of
//! [`CilPrimitiveKind`]'s variants, so their tokens are stable across registries.

use strum::{EnumCount, EnumIter};

use crate::metadata::token::{TableId, Token};

/// Represents the primitive and root types of the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum CilPrimitiveKind {
    /// System.Object - base class for all reference types
    Object,
    /// System.ValueType - base class for value types
    ValueType,
    /// System.Void - represents no value
    Void,
    /// System.Boolean - true/false value
    Boolean,
    /// System.Char - Unicode 16-bit character
    Char,
    /// System.SByte - signed 8-bit integer
    I1,
    /// System.Byte - unsigned 8-bit integer
    U1,
    /// System.Int16 - signed 16-bit integer
    I2,
    /// System.UInt16 - unsigned 16-bit integer
    U2,
    /// System.Int32 - signed 32-bit integer
    I4,
    /// System.UInt32 - unsigned 32-bit integer
    U4,
    /// System.Int64 - signed 64-bit integer
    I8,
    /// System.UInt64 - unsigned 64-bit integer
    U8,
    /// System.Single - 32-bit floating point
    R4,
    /// System.Double - 64-bit floating point
    R8,
    /// System.String - immutable string of Unicode characters
    String,
    /// System.Attribute - base class for attribute classes
    Attribute,
    /// System.Delegate - base class for event handler types
    Delegate,
}

impl CilPrimitiveKind {
    /// Get the token for this type
    #[must_use]
    pub fn token(&self) -> Token {
        Token::from_parts(TableId::TypeDef, *self as u32 + 1)
    }

    /// Get the namespace of this type
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        "System"
    }

    /// Get the short name (without namespace)
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CilPrimitiveKind::Object => "Object",
            CilPrimitiveKind::ValueType => "ValueType",
            CilPrimitiveKind::Void => "Void",
            CilPrimitiveKind::Boolean => "Boolean",
            CilPrimitiveKind::Char => "Char",
            CilPrimitiveKind::I1 => "SByte",
            CilPrimitiveKind::U1 => "Byte",
            CilPrimitiveKind::I2 => "Int16",
            CilPrimitiveKind::U2 => "UInt16",
            CilPrimitiveKind::I4 => "Int32",
            CilPrimitiveKind::U4 => "UInt32",
            CilPrimitiveKind::I8 => "Int64",
            CilPrimitiveKind::U8 => "UInt64",
            CilPrimitiveKind::R4 => "Single",
            CilPrimitiveKind::R8 => "Double",
            CilPrimitiveKind::String => "String",
            CilPrimitiveKind::Attribute => "Attribute",
            CilPrimitiveKind::Delegate => "Delegate",
        }
    }

    /// Returns `true` for types deriving from System.ValueType
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        !matches!(
            self,
            CilPrimitiveKind::Object
                | CilPrimitiveKind::ValueType
                | CilPrimitiveKind::String
                | CilPrimitiveKind::Attribute
                | CilPrimitiveKind::Delegate
        )
    }

    /// The primitive this one derives from, `None` for System.Object
    #[must_use]
    pub fn base(&self) -> Option<CilPrimitiveKind> {
        match self {
            CilPrimitiveKind::Object => None,
            CilPrimitiveKind::ValueType
            | CilPrimitiveKind::String
            | CilPrimitiveKind::Attribute
            | CilPrimitiveKind::Delegate => Some(CilPrimitiveKind::Object),
            _ => Some(CilPrimitiveKind::ValueType),
        }
    }
}
