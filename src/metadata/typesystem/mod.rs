//! In-memory type system implementing the introspection capabilities.
//!
//! This module provides a complete, self-contained host for the traits in
//! [`crate::metadata::introspection`]: types with base types, interfaces and generics, and the
//! members they declare, each carrying its own native attributes. The annotation and projection
//! layers work against the traits only; this model is what the crate's tests, benchmarks and
//! examples run on.
//!
//! # Key Components
//!
//! - [`CilType`]: A type definition, generic instance, array, by-ref or generic parameter
//! - [`CilMethod`], [`CilField`], [`CilProperty`], [`CilEvent`], [`CilParam`]: Members
//! - [`TypeRegistry`]: Owner of all types of one assembly, with primitives pre-registered
//! - [`TypeBuilder`] and the member builders: Fluent construction of definitions
//!
//! # Type System Features
//!
//! - **Generic support**: Generic instances share their definition's members and attributes
//! - **Override tracking**: Virtual methods resolve the base method they override, properties
//!   and events follow their accessors
//! - **Shadowing**: `NEW_SLOT` methods start a new slot and override nothing
//! - **Inherited attribute queries**: Natively honour `Inherited` and `AllowMultiple`
//!
//! # Examples
//!
//! ```rust
//! use attrscope::metadata::introspection::{MemberInfo, TypeInfo};
//! use attrscope::metadata::typesystem::{
//!     CilPrimitiveKind, MethodBuilder, MethodModifiers, TypeBuilder, TypeRegistry,
//! };
//!
//! let registry = TypeRegistry::new("Sample");
//! let int32 = registry.get_primitive(CilPrimitiveKind::I4)?;
//!
//! let shape = TypeBuilder::class("Sample", "Shape").abstract_type().build(&registry)?;
//! MethodBuilder::new("Scale")
//!     .modifiers(MethodModifiers::VIRTUAL | MethodModifiers::NEW_SLOT)
//!     .parameter("factor", &int32)
//!     .build(&shape)?;
//!
//! let circle = TypeBuilder::class("Sample", "Circle").extends(&shape).build(&registry)?;
//! let scale = MethodBuilder::new("Scale")
//!     .modifiers(MethodModifiers::VIRTUAL)
//!     .parameter("factor", &int32)
//!     .build(&circle)?;
//!
//! assert_eq!(circle.full_name(), "Sample.Circle");
//! assert_eq!(scale.overridden().map(|m| m.token), shape.methods.get(0).map(|m| m.token));
//! # Ok::<(), attrscope::Error>(())
//! ```

mod builder;
mod members;
mod primitives;
mod registry;

use std::{
    fmt,
    iter,
    sync::{Arc, OnceLock, Weak},
};

use bitflags::bitflags;

pub use builder::{EventBuilder, FieldBuilder, MethodBuilder, PropertyBuilder, TypeBuilder};
pub use members::{
    CilEvent, CilEventRc, CilField, CilFieldRc, CilMethod, CilMethodRc, CilParam, CilParamRc,
    CilProperty, CilPropertyRc, MethodModifiers, ParamType,
};
pub use primitives::CilPrimitiveKind;
pub use registry::TypeRegistry;

use crate::{
    metadata::{
        customattributes::{merge_inherited, CustomAttributeRc},
        introspection::{
            AssemblyRc, AttributeProvider, ElementKind, EventRc, FieldRc, MemberInfo, MethodRc,
            PropertyRc, TypeHandle, TypeInfo, TypeRc,
        },
        token::Token,
    },
    Error::TypeError,
    Result,
};

/// Reference to a `CilType`
pub type CilTypeRc = Arc<CilType>;
/// A shared, append-only list of attributes
///
/// Generic instances and instantiated generic methods share the list of their definition.
pub type CustomAttributeList = Arc<boxcar::Vec<CustomAttributeRc>>;

/// A weak reference to a `CilType`, used for back links that would otherwise form cycles
#[derive(Clone, Debug)]
pub struct CilTypeRef {
    weak_ref: Weak<CilType>,
}

impl CilTypeRef {
    /// Create a new `CilTypeRef` from a strong reference
    pub fn new(strong_ref: &CilTypeRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the type, returning None if the type has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<CilTypeRc> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced type is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }
}

impl From<&CilTypeRc> for CilTypeRef {
    fn from(strong_ref: &CilTypeRc) -> Self {
        CilTypeRef::new(strong_ref)
    }
}

/// The shape of a `CilType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CilFlavor {
    /// A reference type definition
    Class,
    /// An interface definition
    Interface,
    /// A value type definition
    ValueType,
    /// A generic type instantiated with type arguments
    GenericInstance,
    /// A single-dimensional array of an element type
    Array,
    /// A managed reference to an element type
    ByRef,
    /// A generic parameter of a type or a method
    GenericParameter,
}

bitflags! {
    /// Type-level modifiers, using the `TypeAttributes` bit values
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeModifiers: u32 {
        /// Type cannot be instantiated
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be derived from
        const SEALED = 0x0000_0100;
    }
}

/// Represents a type: a definition, a generic instance, an array, a by-ref or a generic
/// parameter. The `Token` is a `TypeDef` token for definitions, a `TypeSpec` token for
/// constructed types and a `GenericParam` token for generic parameters.
pub struct CilType {
    /// Token
    pub token: Token,
    /// The shape of this type
    pub flavor: CilFlavor,
    /// `TypeNamespace` (can be empty for the global namespace)
    pub namespace: String,
    /// `TypeName`
    pub name: String,
    /// Abstract / sealed modifiers
    pub modifiers: TypeModifiers,
    /// Exact identity of this type
    pub(crate) handle: TypeHandle,
    /// The registry owning this type
    pub(crate) registry: Weak<TypeRegistry>,
    /// This types base aka 'extends'
    base: OnceLock<CilTypeRef>,
    /// The type this one is nested in
    enclosing: OnceLock<CilTypeRef>,
    /// All interfaces this type declares
    pub interfaces: boxcar::Vec<CilTypeRef>,
    /// All types that are 'contained' in this type
    pub nested_types: boxcar::Vec<CilTypeRef>,
    /// All generic parameters this type declares (definitions only)
    pub generic_params: boxcar::Vec<CilTypeRc>,
    /// Type arguments of a generic instance
    pub(crate) generic_args: Vec<CilTypeRc>,
    /// The generic definition of a generic instance
    pub(crate) generic_definition: Option<CilTypeRc>,
    /// Element type of arrays and by-refs
    pub(crate) element: Option<CilTypeRc>,
    /// All fields this type declares
    pub fields: boxcar::Vec<CilFieldRc>,
    /// All methods and constructors this type declares
    pub methods: boxcar::Vec<CilMethodRc>,
    /// All properties this type declares
    pub properties: boxcar::Vec<CilPropertyRc>,
    /// All events this type declares
    pub events: boxcar::Vec<CilEventRc>,
    /// All custom attributes this type has
    pub custom_attributes: CustomAttributeList,
}

impl CilType {
    /// Create a new instance of a `CilType` without members, base or attributes
    ///
    /// ## Arguments
    /// * 'token'     - The token of the type
    /// * 'flavor'    - The shape of the type
    /// * 'namespace' - The namespace
    /// * 'name'      - The simple name
    /// * 'handle'    - The exact identity of the type
    /// * 'registry'  - The registry that will own the type
    pub(crate) fn new(
        token: Token,
        flavor: CilFlavor,
        namespace: String,
        name: String,
        handle: TypeHandle,
        registry: Weak<TypeRegistry>,
    ) -> Self {
        CilType {
            token,
            flavor,
            namespace,
            name,
            modifiers: TypeModifiers::empty(),
            handle,
            registry,
            base: OnceLock::new(),
            enclosing: OnceLock::new(),
            interfaces: boxcar::Vec::new(),
            nested_types: boxcar::Vec::new(),
            generic_params: boxcar::Vec::new(),
            generic_args: Vec::new(),
            generic_definition: None,
            element: None,
            fields: boxcar::Vec::new(),
            methods: boxcar::Vec::new(),
            properties: boxcar::Vec::new(),
            events: boxcar::Vec::new(),
            custom_attributes: Arc::new(boxcar::Vec::new()),
        }
    }

    /// Returns the full name (Namespace.Name) of the type
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{0}.{1}", self.namespace, self.name)
        }
    }

    /// Access the base type of this type, if it exists
    #[must_use]
    pub fn base(&self) -> Option<CilTypeRc> {
        self.base.get().and_then(CilTypeRef::upgrade)
    }

    /// Set the base type of this type
    ///
    /// ## Arguments
    /// * 'base_type' - The base of this type
    ///
    /// # Errors
    /// Returns an error if the base type was already set.
    pub fn set_base(&self, base_type: &CilTypeRc) -> Result<()> {
        self.base
            .set(CilTypeRef::new(base_type))
            .map_err(|_| TypeError(format!("Base type of '{}' is already set", self.fullname())))
    }

    /// The type this one is nested in
    #[must_use]
    pub fn enclosing_type(&self) -> Option<CilTypeRc> {
        self.enclosing.get().and_then(CilTypeRef::upgrade)
    }

    /// Nest this type inside `outer`
    ///
    /// # Errors
    /// Returns an error if the enclosing type was already set.
    pub(crate) fn set_enclosing(&self, outer: &CilTypeRc) -> Result<()> {
        self.enclosing
            .set(CilTypeRef::new(outer))
            .map_err(|_| TypeError(format!("'{}' is already nested", self.fullname())))
    }

    /// The registry owning this type
    #[must_use]
    pub fn registry(&self) -> Option<Arc<TypeRegistry>> {
        self.registry.upgrade()
    }

    /// The generic definition of a generic instance
    #[must_use]
    pub fn generic_definition(&self) -> Option<&CilTypeRc> {
        self.generic_definition.as_ref()
    }

    /// Type arguments of a generic instance
    #[must_use]
    pub fn generic_args(&self) -> &[CilTypeRc] {
        &self.generic_args
    }

    /// Element type of arrays and by-refs
    #[must_use]
    pub fn element(&self) -> Option<&CilTypeRc> {
        self.element.as_ref()
    }

    /// Returns `true` if this type declares generic parameters
    #[must_use]
    pub fn is_generic_definition(&self) -> bool {
        self.generic_definition.is_none() && self.generic_params.count() > 0
    }

    /// Returns `true` if this type can carry declared members
    #[must_use]
    pub fn is_definition(&self) -> bool {
        matches!(
            self.flavor,
            CilFlavor::Class | CilFlavor::Interface | CilFlavor::ValueType
        )
    }

    /// The type whose member lists serve this one; generic instances use their definition
    #[must_use]
    pub fn member_source(&self) -> &CilType {
        self.generic_definition.as_deref().unwrap_or(self)
    }

    /// Add a custom attribute to this type
    ///
    /// Generic instances share the attribute list of their definition, so adding to either
    /// affects both.
    pub fn add_custom_attribute(&self, attribute: CustomAttributeRc) {
        self.custom_attributes.push(attribute);
    }

    /// Attributes declared directly on this type
    #[must_use]
    pub fn declared_attributes(&self) -> Vec<CustomAttributeRc> {
        self.custom_attributes
            .iter()
            .map(|(_, attr)| attr.clone())
            .collect()
    }

    /// Look up a declared method or constructor by name, first match wins
    #[must_use]
    pub fn method(&self, name: &str) -> Option<CilMethodRc> {
        self.member_source()
            .methods
            .iter()
            .find(|(_, method)| method.name == name)
            .map(|(_, method)| method.clone())
    }
}

impl fmt::Debug for CilType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CilType")
            .field("token", &self.token)
            .field("flavor", &self.flavor)
            .field("fullname", &self.fullname())
            .finish_non_exhaustive()
    }
}

impl AttributeProvider for CilType {
    fn custom_attributes(&self, inherit: bool) -> Vec<CustomAttributeRc> {
        if !inherit {
            return self.declared_attributes();
        }

        let bases = iter::successors(self.base(), |ty| ty.base());
        merge_inherited(
            iter::once(self.declared_attributes())
                .chain(bases.map(|base| base.declared_attributes())),
            None,
        )
    }
}

impl MemberInfo for CilType {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> Token {
        self.token
    }

    fn element_kind(&self) -> ElementKind {
        ElementKind::Type
    }

    fn declaring_type(&self) -> Option<TypeRc> {
        self.enclosing_type().map(|outer| outer as TypeRc)
    }
}

impl TypeInfo for CilType {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn handle(&self) -> TypeHandle {
        self.handle.clone()
    }

    fn assembly(&self) -> Option<AssemblyRc> {
        self.registry().map(|registry| registry as AssemblyRc)
    }

    fn base_type(&self) -> Option<TypeRc> {
        self.base().map(|base| base as TypeRc)
    }

    fn interfaces(&self) -> Vec<TypeRc> {
        self.member_source()
            .interfaces
            .iter()
            .filter_map(|(_, interface)| interface.upgrade())
            .map(|interface| interface as TypeRc)
            .collect()
    }

    fn is_interface(&self) -> bool {
        self.member_source().flavor == CilFlavor::Interface
    }

    fn is_value_type(&self) -> bool {
        self.member_source().flavor == CilFlavor::ValueType
    }

    fn is_abstract(&self) -> bool {
        self.is_interface() || self.modifiers.contains(TypeModifiers::ABSTRACT)
    }

    fn is_sealed(&self) -> bool {
        self.modifiers.contains(TypeModifiers::SEALED)
    }

    fn is_generic_type_definition(&self) -> bool {
        self.is_generic_definition()
    }

    fn generic_arguments(&self) -> Vec<TypeRc> {
        if self.generic_definition.is_some() {
            self.generic_args
                .iter()
                .map(|arg| arg.clone() as TypeRc)
                .collect()
        } else {
            self.generic_params
                .iter()
                .map(|(_, param)| param.clone() as TypeRc)
                .collect()
        }
    }

    fn generic_type_definition(&self) -> Option<TypeRc> {
        self.generic_definition
            .clone()
            .map(|definition| definition as TypeRc)
    }

    fn element_type(&self) -> Option<TypeRc> {
        self.element.clone().map(|element| element as TypeRc)
    }

    fn fields(&self) -> Vec<FieldRc> {
        self.member_source()
            .fields
            .iter()
            .map(|(_, field)| field.clone() as FieldRc)
            .collect()
    }

    fn methods(&self) -> Vec<MethodRc> {
        self.member_source()
            .methods
            .iter()
            .filter(|(_, method)| !method.is_constructor())
            .map(|(_, method)| method.clone() as MethodRc)
            .collect()
    }

    fn constructors(&self) -> Vec<MethodRc> {
        self.member_source()
            .methods
            .iter()
            .filter(|(_, method)| method.is_constructor())
            .map(|(_, method)| method.clone() as MethodRc)
            .collect()
    }

    fn properties(&self) -> Vec<PropertyRc> {
        self.member_source()
            .properties
            .iter()
            .map(|(_, property)| property.clone() as PropertyRc)
            .collect()
    }

    fn events(&self) -> Vec<EventRc> {
        self.member_source()
            .events
            .iter()
            .map(|(_, event)| event.clone() as EventRc)
            .collect()
    }

    fn nested_types(&self) -> Vec<TypeRc> {
        self.member_source()
            .nested_types
            .iter()
            .filter_map(|(_, nested)| nested.upgrade())
            .map(|nested| nested as TypeRc)
            .collect()
    }
}
