//! Introspection capabilities for program elements.
//!
//! This module defines the boundary between the crate and a host type system. Every kind of
//! program element has one object-safe capability trait, handed around as `Arc<dyn Trait>`:
//!
//! - [`TypeInfo`] - Types, with declared-only member enumeration
//! - [`MethodInfo`] - Methods and constructors
//! - [`FieldInfo`], [`PropertyInfo`], [`EventInfo`] - Simple members
//! - [`ParameterInfo`] - Method parameters and the return value slot
//! - [`AssemblyInfo`] - The unit that owns types
//!
//! All of them share [`AttributeProvider`], the family of attribute queries that the projection
//! layer re-implements. Everything else a host offers is passed through unchanged.
//!
//! The crate ships a complete in-memory host in [`crate::metadata::typesystem`]; any other
//! host only has to implement these traits.
//!
//! # Identity
//!
//! Types expose an exact [`TypeHandle`], members expose their [`Token`]. Handles to the same
//! declared element always yield the same handle or token.

mod handle;

use std::{fmt, sync::Arc};

use strum::{Display, EnumIter};

pub use handle::TypeHandle;

use crate::metadata::{
    customattributes::{AttributeKind, CustomAttributeRc},
    token::Token,
};

/// A reference-counted type handle
pub type TypeRc = Arc<dyn TypeInfo>;
/// A reference-counted method or constructor handle
pub type MethodRc = Arc<dyn MethodInfo>;
/// A reference-counted field handle
pub type FieldRc = Arc<dyn FieldInfo>;
/// A reference-counted property handle
pub type PropertyRc = Arc<dyn PropertyInfo>;
/// A reference-counted event handle
pub type EventRc = Arc<dyn EventInfo>;
/// A reference-counted parameter handle
pub type ParameterRc = Arc<dyn ParameterInfo>;
/// A reference-counted assembly handle
pub type AssemblyRc = Arc<dyn AssemblyInfo>;

/// The kind of a program element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ElementKind {
    /// A type
    Type,
    /// A field
    Field,
    /// A property
    Property,
    /// An event
    Event,
    /// A method
    Method,
    /// A constructor
    Constructor,
    /// A method parameter
    Parameter,
    /// The return value slot of a method
    #[strum(to_string = "return value")]
    ReturnValue,
    /// An assembly
    Assembly,
}

/// Attribute queries shared by every program element.
///
/// `inherit` requests the inherited view: for types the base-type chain, for methods,
/// properties and events the chain of overridden members. Parameters, return values, fields,
/// constructors and assemblies have no predecessors, so `inherit` does not change their result.
pub trait AttributeProvider: Send + Sync {
    /// All attributes applying to this element
    fn custom_attributes(&self, inherit: bool) -> Vec<CustomAttributeRc>;

    /// Attributes that are instances of `kind` or of a kind derived from it
    fn custom_attributes_of(&self, kind: &AttributeKind, inherit: bool) -> Vec<CustomAttributeRc> {
        self.custom_attributes(inherit)
            .into_iter()
            .filter(|attr| attr.is_instance_of(kind))
            .collect()
    }

    /// Returns `true` if [`AttributeProvider::custom_attributes_of`] is non-empty
    fn is_defined(&self, kind: &AttributeKind, inherit: bool) -> bool {
        !self.custom_attributes_of(kind, inherit).is_empty()
    }
}

/// Common capabilities of types and their members
pub trait MemberInfo: AttributeProvider {
    /// Simple name of the member
    fn name(&self) -> &str;

    /// Token of the member's definition
    fn token(&self) -> Token;

    /// What kind of element this is
    fn element_kind(&self) -> ElementKind;

    /// The type that directly contains this declaration (the enclosing type for nested types)
    fn declaring_type(&self) -> Option<TypeRc>;
}

/// Capabilities of a type
pub trait TypeInfo: MemberInfo {
    /// Namespace, empty for the global namespace
    fn namespace(&self) -> &str;

    /// Exact identity of this type
    fn handle(&self) -> TypeHandle;

    /// The assembly defining this type
    fn assembly(&self) -> Option<AssemblyRc>;

    /// The direct base type
    fn base_type(&self) -> Option<TypeRc>;

    /// Interfaces this type declares it implements
    fn interfaces(&self) -> Vec<TypeRc>;

    /// Returns `true` for interfaces
    fn is_interface(&self) -> bool;

    /// Returns `true` for value types
    fn is_value_type(&self) -> bool;

    /// Returns `true` for abstract types
    fn is_abstract(&self) -> bool;

    /// Returns `true` for sealed types
    fn is_sealed(&self) -> bool;

    /// Returns `true` for an open generic type definition such as `List<T>`
    fn is_generic_type_definition(&self) -> bool;

    /// Type arguments of a constructed generic type, or the generic parameters of a definition
    fn generic_arguments(&self) -> Vec<TypeRc>;

    /// The generic type definition of a constructed generic type
    fn generic_type_definition(&self) -> Option<TypeRc>;

    /// Element type of arrays and by-ref types
    fn element_type(&self) -> Option<TypeRc>;

    /// Fields declared by this type
    fn fields(&self) -> Vec<FieldRc>;

    /// Methods declared by this type, constructors excluded
    fn methods(&self) -> Vec<MethodRc>;

    /// Constructors declared by this type
    fn constructors(&self) -> Vec<MethodRc>;

    /// Properties declared by this type
    fn properties(&self) -> Vec<PropertyRc>;

    /// Events declared by this type
    fn events(&self) -> Vec<EventRc>;

    /// Types nested in this type
    fn nested_types(&self) -> Vec<TypeRc>;

    /// The wrapped type, for projections; `None` for host types
    fn underlying(&self) -> Option<TypeRc> {
        None
    }

    /// Returns the full name (Namespace.Name) of the type
    fn full_name(&self) -> String {
        if self.namespace().is_empty() {
            self.name().to_string()
        } else {
            format!("{0}.{1}", self.namespace(), self.name())
        }
    }

    /// Returns `true` for constructed generic types such as `List<int>`
    fn is_constructed_generic_type(&self) -> bool {
        self.handle().is_constructed()
    }

    /// First declared field named `name`
    fn field(&self, name: &str) -> Option<FieldRc> {
        self.fields().into_iter().find(|f| f.name() == name)
    }

    /// First declared property named `name`
    fn property(&self, name: &str) -> Option<PropertyRc> {
        self.properties().into_iter().find(|p| p.name() == name)
    }

    /// First declared event named `name`
    fn event(&self, name: &str) -> Option<EventRc> {
        self.events().into_iter().find(|e| e.name() == name)
    }

    /// All declared methods named `name`
    fn methods_named(&self, name: &str) -> Vec<MethodRc> {
        self.methods()
            .into_iter()
            .filter(|m| m.name() == name)
            .collect()
    }

    /// All declared members
    fn members(&self) -> Vec<MemberRef> {
        let mut members: Vec<MemberRef> = Vec::new();
        members.extend(self.fields().into_iter().map(MemberRef::Field));
        members.extend(self.constructors().into_iter().map(MemberRef::Method));
        members.extend(self.methods().into_iter().map(MemberRef::Method));
        members.extend(self.properties().into_iter().map(MemberRef::Property));
        members.extend(self.events().into_iter().map(MemberRef::Event));
        members.extend(self.nested_types().into_iter().map(MemberRef::Type));
        members
    }

    /// Returns `true` if `other` appears in this type's base-type chain
    fn is_subclass_of(&self, other: &dyn TypeInfo) -> bool {
        let target = other.handle();
        let mut current = self.base_type();
        while let Some(base) = current {
            if base.handle() == target {
                return true;
            }
            current = base.base_type();
        }

        false
    }
}

/// Capabilities of a method or constructor
pub trait MethodInfo: MemberInfo {
    /// Declared parameters, in order
    fn parameters(&self) -> Vec<ParameterRc>;

    /// The return value slot (position -1)
    fn return_parameter(&self) -> ParameterRc;

    /// Return type, `None` for `void`
    fn return_type(&self) -> Option<TypeRc>;

    /// Returns `true` for virtual methods
    fn is_virtual(&self) -> bool;

    /// Returns `true` for abstract methods
    fn is_abstract(&self) -> bool;

    /// Returns `true` for static methods
    fn is_static(&self) -> bool;

    /// Returns `true` for an open generic method definition
    fn is_generic_method_definition(&self) -> bool;

    /// Type arguments of an instantiated generic method, or the parameters of a definition
    fn generic_arguments(&self) -> Vec<TypeRc>;

    /// The generic method definition of an instantiated generic method
    fn generic_method_definition(&self) -> Option<MethodRc>;

    /// The method this one overrides (the base-definition relation), `None` when this method
    /// is not an override or shadows its base
    fn overridden_method(&self) -> Option<MethodRc>;

    /// The wrapped method, for projections; `None` for host methods
    fn underlying(&self) -> Option<MethodRc> {
        None
    }

    /// Returns `true` for generic method definitions and instantiations
    fn is_generic_method(&self) -> bool {
        self.is_generic_method_definition() || self.generic_method_definition().is_some()
    }

    /// Returns `true` for constructors
    fn is_constructor(&self) -> bool {
        self.element_kind() == ElementKind::Constructor
    }

    /// Display signature, e.g. `Add(System.Int32, System.String)`
    fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters()
            .iter()
            .map(|p| p.parameter_type().map_or_else(String::new, |t| t.full_name()))
            .collect();
        format!("{}({})", self.name(), params.join(", "))
    }
}

/// Capabilities of a field
pub trait FieldInfo: MemberInfo {
    /// Declared field type
    fn field_type(&self) -> TypeRc;

    /// Returns `true` for static fields
    fn is_static(&self) -> bool;

    /// The wrapped field, for projections; `None` for host fields
    fn underlying(&self) -> Option<FieldRc> {
        None
    }
}

/// Capabilities of a property
pub trait PropertyInfo: MemberInfo {
    /// Declared property type
    fn property_type(&self) -> TypeRc;

    /// The get accessor
    fn getter(&self) -> Option<MethodRc>;

    /// The set accessor
    fn setter(&self) -> Option<MethodRc>;

    /// The property this one overrides, `None` when it is not an override or shadows its base
    fn overridden_property(&self) -> Option<PropertyRc>;

    /// The wrapped property, for projections; `None` for host properties
    fn underlying(&self) -> Option<PropertyRc> {
        None
    }

    /// Returns `true` if the property has a get accessor
    fn can_read(&self) -> bool {
        self.getter().is_some()
    }

    /// Returns `true` if the property has a set accessor
    fn can_write(&self) -> bool {
        self.setter().is_some()
    }
}

/// Capabilities of an event
pub trait EventInfo: MemberInfo {
    /// The delegate type of the event
    fn handler_type(&self) -> Option<TypeRc>;

    /// The add accessor
    fn add_method(&self) -> Option<MethodRc>;

    /// The remove accessor
    fn remove_method(&self) -> Option<MethodRc>;

    /// The event this one overrides, `None` when it is not an override or shadows its base
    fn overridden_event(&self) -> Option<EventRc>;

    /// The wrapped event, for projections; `None` for host events
    fn underlying(&self) -> Option<EventRc> {
        None
    }
}

/// Capabilities of a parameter or return value slot
pub trait ParameterInfo: AttributeProvider {
    /// Parameter name, `None` for the return value
    fn name(&self) -> Option<&str>;

    /// Zero-based position, -1 for the return value
    fn position(&self) -> i32;

    /// Declared parameter type, `None` for a `void` return
    fn parameter_type(&self) -> Option<TypeRc>;

    /// The method declaring this parameter, `None` once the method is gone
    fn member(&self) -> Option<MethodRc>;

    /// The wrapped parameter, for projections; `None` for host parameters
    fn underlying(&self) -> Option<ParameterRc> {
        None
    }

    /// [`ElementKind::ReturnValue`] for position -1, else [`ElementKind::Parameter`]
    fn element_kind(&self) -> ElementKind {
        if self.position() < 0 {
            ElementKind::ReturnValue
        } else {
            ElementKind::Parameter
        }
    }
}

/// Capabilities of an assembly
pub trait AssemblyInfo: AttributeProvider {
    /// Simple assembly name
    fn name(&self) -> &str;

    /// Identifier of this loaded assembly, unique among assemblies sharing its name
    ///
    /// Becomes part of every [`TypeHandle::Definition`] the assembly hands out, so types of
    /// two same-named assemblies never share an identity.
    fn module_id(&self) -> u64;

    /// All type definitions of the assembly
    fn types(&self) -> Vec<TypeRc>;

    /// The wrapped assembly, for projections; `None` for host assemblies
    fn underlying(&self) -> Option<AssemblyRc> {
        None
    }

    /// Look up a type definition by full name
    fn get_type(&self, full_name: &str) -> Option<TypeRc> {
        self.types().into_iter().find(|t| t.full_name() == full_name)
    }
}

/// An owned handle to any member, used for generic dispatch
#[derive(Clone)]
pub enum MemberRef {
    /// A (nested) type
    Type(TypeRc),
    /// A method or constructor
    Method(MethodRc),
    /// A field
    Field(FieldRc),
    /// A property
    Property(PropertyRc),
    /// An event
    Event(EventRc),
}

impl MemberRef {
    /// The element kind of the referenced member
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            MemberRef::Type(t) => t.element_kind(),
            MemberRef::Method(m) => m.element_kind(),
            MemberRef::Field(f) => f.element_kind(),
            MemberRef::Property(p) => p.element_kind(),
            MemberRef::Event(e) => e.element_kind(),
        }
    }

    /// The simple name of the referenced member
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            MemberRef::Type(t) => t.name(),
            MemberRef::Method(m) => m.name(),
            MemberRef::Field(f) => f.name(),
            MemberRef::Property(p) => p.name(),
            MemberRef::Event(e) => e.name(),
        }
    }

    /// The declaring type of the referenced member
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeRc> {
        match self {
            MemberRef::Type(t) => t.declaring_type(),
            MemberRef::Method(m) => m.declaring_type(),
            MemberRef::Field(f) => f.declaring_type(),
            MemberRef::Property(p) => p.declaring_type(),
            MemberRef::Event(e) => e.declaring_type(),
        }
    }

    /// Attribute query on the referenced member
    #[must_use]
    pub fn custom_attributes(&self, inherit: bool) -> Vec<CustomAttributeRc> {
        self.as_element().custom_attributes(None, inherit)
    }

    /// Borrow as an [`ElementRef`]
    #[must_use]
    pub fn as_element(&self) -> ElementRef<'_> {
        match self {
            MemberRef::Type(t) => ElementRef::Type(t.as_ref()),
            MemberRef::Method(m) => ElementRef::Method(m.as_ref()),
            MemberRef::Field(f) => ElementRef::Field(f.as_ref()),
            MemberRef::Property(p) => ElementRef::Property(p.as_ref()),
            MemberRef::Event(e) => ElementRef::Event(e.as_ref()),
        }
    }
}

impl fmt::Debug for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberRef({}: {})", self.kind(), self.name())
    }
}

/// A borrowed handle to any program element
#[derive(Clone, Copy)]
pub enum ElementRef<'a> {
    /// A type
    Type(&'a dyn TypeInfo),
    /// A method or constructor
    Method(&'a dyn MethodInfo),
    /// A field
    Field(&'a dyn FieldInfo),
    /// A property
    Property(&'a dyn PropertyInfo),
    /// An event
    Event(&'a dyn EventInfo),
    /// A parameter or return value slot
    Parameter(&'a dyn ParameterInfo),
    /// An assembly
    Assembly(&'a dyn AssemblyInfo),
}

impl ElementRef<'_> {
    /// The element kind
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementRef::Type(t) => t.element_kind(),
            ElementRef::Method(m) => m.element_kind(),
            ElementRef::Field(f) => f.element_kind(),
            ElementRef::Property(p) => p.element_kind(),
            ElementRef::Event(e) => e.element_kind(),
            ElementRef::Parameter(p) => p.element_kind(),
            ElementRef::Assembly(_) => ElementKind::Assembly,
        }
    }

    /// Forward an attribute query to the element, optionally filtered by kind
    #[must_use]
    pub fn custom_attributes(
        &self,
        kind: Option<&AttributeKind>,
        inherit: bool,
    ) -> Vec<CustomAttributeRc> {
        match (self, kind) {
            (ElementRef::Type(t), Some(k)) => t.custom_attributes_of(k, inherit),
            (ElementRef::Type(t), None) => t.custom_attributes(inherit),
            (ElementRef::Method(m), Some(k)) => m.custom_attributes_of(k, inherit),
            (ElementRef::Method(m), None) => m.custom_attributes(inherit),
            (ElementRef::Field(f), Some(k)) => f.custom_attributes_of(k, inherit),
            (ElementRef::Field(f), None) => f.custom_attributes(inherit),
            (ElementRef::Property(p), Some(k)) => p.custom_attributes_of(k, inherit),
            (ElementRef::Property(p), None) => p.custom_attributes(inherit),
            (ElementRef::Event(e), Some(k)) => e.custom_attributes_of(k, inherit),
            (ElementRef::Event(e), None) => e.custom_attributes(inherit),
            (ElementRef::Parameter(p), Some(k)) => p.custom_attributes_of(k, inherit),
            (ElementRef::Parameter(p), None) => p.custom_attributes(inherit),
            (ElementRef::Assembly(a), Some(k)) => a.custom_attributes_of(k, inherit),
            (ElementRef::Assembly(a), None) => a.custom_attributes(inherit),
        }
    }
}

impl fmt::Debug for dyn TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeInfo({})", self.full_name())
    }
}

impl fmt::Debug for dyn MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodInfo({})", self.signature())
    }
}

impl fmt::Debug for dyn ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParameterInfo({}, position: {})",
            self.name().unwrap_or("<return>"),
            self.position()
        )
    }
}
