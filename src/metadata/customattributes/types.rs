//! CustomAttribute-specific types and data structures.
//!
//! This module contains the types used to represent attribute instances, the attribute kinds
//! they are instances of, and the usage policy each kind declares. Attribute instances are
//! opaque to the annotation table: they are stored, ordered and returned, never inspected,
//! except for their kind, which drives the inheritance and multiplicity rules.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

/// A reference-counted pointer to a `CustomAttribute`
pub type CustomAttributeRc = Arc<CustomAttribute>;
/// A reference-counted pointer to an `AttributeKind`
pub type AttributeKindRc = Arc<AttributeKind>;

/// Usage policy of an attribute kind.
///
/// Mirrors the two switches of .NET's `AttributeUsageAttribute` that matter for attribute
/// lookup. When a kind does not declare a policy, it inherits the one of its base kind, and
/// a kind without any policy in its chain uses [`AttributeUsage::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeUsage {
    /// Instances declared on a base element are visible through derived elements
    pub inherited: bool,
    /// More than one instance of the kind may apply to a single element
    pub allow_multiple: bool,
}

impl AttributeUsage {
    /// Create a new usage policy
    ///
    /// ## Arguments
    /// * 'inherited'      - Whether base declarations flow to derived elements
    /// * 'allow_multiple' - Whether several instances may apply to one element
    #[must_use]
    pub const fn new(inherited: bool, allow_multiple: bool) -> Self {
        AttributeUsage {
            inherited,
            allow_multiple,
        }
    }
}

impl Default for AttributeUsage {
    /// `Inherited = true, AllowMultiple = false`, the runtime default
    fn default() -> Self {
        AttributeUsage::new(true, false)
    }
}

/// Describes a kind of attribute: its name, its base kind and its declared usage.
///
/// Kinds are owned by the host introspection system. Two kinds are equal when their full
/// names are equal, which keeps kind identity stable across independently created handles.
///
/// # Examples
///
/// ```rust
/// use attrscope::metadata::customattributes::{AttributeKind, AttributeUsage};
///
/// let base = AttributeKind::new("Sample", "ValidationAttribute")
///     .with_usage(AttributeUsage::new(true, true))
///     .into_rc();
/// let required = AttributeKind::new("Sample", "RequiredAttribute")
///     .with_base(&base)
///     .into_rc();
///
/// assert!(required.is_assignable_to(&base));
/// assert!(required.usage().allow_multiple);
/// ```
#[derive(Debug, Clone)]
pub struct AttributeKind {
    /// Namespace of the attribute class
    pub namespace: String,
    /// Name of the attribute class
    pub name: String,
    /// The kind this one derives from
    base: Option<AttributeKindRc>,
    /// The usage policy declared directly on this kind
    usage: Option<AttributeUsage>,
}

impl AttributeKind {
    /// Create a new kind without base and without declared usage
    ///
    /// ## Arguments
    /// * 'namespace' - Namespace of the attribute class (may be empty)
    /// * 'name'      - Name of the attribute class
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        AttributeKind {
            namespace: namespace.into(),
            name: name.into(),
            base: None,
            usage: None,
        }
    }

    /// Declare the usage policy of this kind
    #[must_use]
    pub fn with_usage(mut self, usage: AttributeUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Set the base kind
    #[must_use]
    pub fn with_base(mut self, base: &AttributeKindRc) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Wrap into a reference-counted handle
    #[must_use]
    pub fn into_rc(self) -> AttributeKindRc {
        Arc::new(self)
    }

    /// Returns the full name (Namespace.Name) of the kind
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{0}.{1}", self.namespace, self.name)
        }
    }

    /// The base kind, if any
    #[must_use]
    pub fn base(&self) -> Option<&AttributeKindRc> {
        self.base.as_ref()
    }

    /// The usage policy declared directly on this kind, without consulting base kinds
    #[must_use]
    pub fn declared_usage(&self) -> Option<AttributeUsage> {
        self.usage
    }

    /// The effective usage policy: declared, else inherited from the base chain, else default
    #[must_use]
    pub fn usage(&self) -> AttributeUsage {
        let mut current = Some(self);
        while let Some(kind) = current {
            if let Some(usage) = kind.usage {
                return usage;
            }
            current = kind.base.as_deref();
        }

        AttributeUsage::default()
    }

    /// Returns `true` if this kind is `other` or derives from it
    #[must_use]
    pub fn is_assignable_to(&self, other: &AttributeKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.base.as_deref();
        }

        false
    }
}

impl PartialEq for AttributeKind {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.name == other.name
    }
}

impl Eq for AttributeKind {}

impl Hash for AttributeKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fullname())
    }
}

/// An attribute instance: its kind plus constructor and named arguments
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttribute {
    /// The kind this attribute is an instance of
    pub kind: AttributeKindRc,
    /// Fixed arguments from the constructor signature
    pub fixed_args: Vec<CustomAttributeArgument>,
    /// Named arguments (fields and properties)
    pub named_args: Vec<CustomAttributeNamedArgument>,
}

impl CustomAttribute {
    /// Create an attribute instance without arguments
    ///
    /// ## Arguments
    /// * 'kind' - The attribute kind
    #[must_use]
    pub fn new(kind: &AttributeKindRc) -> Self {
        CustomAttribute {
            kind: kind.clone(),
            fixed_args: Vec::new(),
            named_args: Vec::new(),
        }
    }

    /// Append a fixed (constructor) argument
    #[must_use]
    pub fn with_arg(mut self, arg: CustomAttributeArgument) -> Self {
        self.fixed_args.push(arg);
        self
    }

    /// Append a named property argument
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: CustomAttributeArgument) -> Self {
        self.named_args.push(CustomAttributeNamedArgument {
            is_field: false,
            name: name.into(),
            arg_type: value.type_name().to_string(),
            value,
        });
        self
    }

    /// Append a named field argument
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: CustomAttributeArgument) -> Self {
        self.named_args.push(CustomAttributeNamedArgument {
            is_field: true,
            name: name.into(),
            arg_type: value.type_name().to_string(),
            value,
        });
        self
    }

    /// Wrap into a reference-counted handle
    #[must_use]
    pub fn into_rc(self) -> CustomAttributeRc {
        Arc::new(self)
    }

    /// Returns `true` if this attribute is an instance of `kind` or of a kind derived from it
    #[must_use]
    pub fn is_instance_of(&self, kind: &AttributeKind) -> bool {
        self.kind.is_assignable_to(kind)
    }

    /// Look up a named argument by name
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&CustomAttributeArgument> {
        self.named_args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }
}

/// Represents a single custom attribute argument value
#[derive(Debug, Clone, PartialEq)]
pub enum CustomAttributeArgument {
    /// Boolean value
    Bool(bool),
    /// Character value (16-bit Unicode)
    Char(char),
    /// Signed 32-bit integer
    I4(i32),
    /// Unsigned 32-bit integer
    U4(u32),
    /// Signed 64-bit integer
    I8(i64),
    /// Unsigned 64-bit integer
    U8(u64),
    /// 64-bit floating point
    R8(f64),
    /// UTF-8 string
    String(String),
    /// Type reference (as full name)
    Type(String),
    /// Array of arguments
    Array(Vec<CustomAttributeArgument>),
    /// Enum value (enum type name + underlying value)
    Enum(String, Box<CustomAttributeArgument>),
}

impl CustomAttributeArgument {
    /// The name of the runtime type carrying this value
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            CustomAttributeArgument::Bool(_) => "System.Boolean",
            CustomAttributeArgument::Char(_) => "System.Char",
            CustomAttributeArgument::I4(_) => "System.Int32",
            CustomAttributeArgument::U4(_) => "System.UInt32",
            CustomAttributeArgument::I8(_) => "System.Int64",
            CustomAttributeArgument::U8(_) => "System.UInt64",
            CustomAttributeArgument::R8(_) => "System.Double",
            CustomAttributeArgument::String(_) => "System.String",
            CustomAttributeArgument::Type(_) => "System.Type",
            CustomAttributeArgument::Array(_) => "System.Array",
            CustomAttributeArgument::Enum(name, _) => name,
        }
    }
}

/// Represents a named argument (field or property) in a custom attribute
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeNamedArgument {
    /// Whether this is a field (true) or property (false)
    pub is_field: bool,
    /// Name of the field or property
    pub name: String,
    /// Type of the argument
    pub arg_type: String,
    /// Value of the argument
    pub value: CustomAttributeArgument,
}
