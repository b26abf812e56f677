//! Builders for type definitions and their members.
//!
//! This module provides fluent builders that create definitions inside a [`TypeRegistry`]:
//! [`TypeBuilder`] for classes, interfaces and value types, and [`MethodBuilder`],
//! [`FieldBuilder`], [`PropertyBuilder`] and [`EventBuilder`] for the members of a built type.
//! Every builder validates its input before anything is registered, so a failed `build` leaves
//! the registry and the declaring type unchanged.
//!
//! # Example
//!
//! ```rust
//! use attrscope::metadata::typesystem::{
//!     CilPrimitiveKind, FieldBuilder, MethodBuilder, ParamType, PropertyBuilder, TypeBuilder,
//!     TypeRegistry,
//! };
//!
//! let registry = TypeRegistry::new("Sample");
//! let string = registry.get_primitive(CilPrimitiveKind::String)?;
//!
//! let cache = TypeBuilder::class("Sample", "Cache`1")
//!     .generic_params(&["TValue"])
//!     .build(&registry)?;
//! let value = cache.generic_params.get(0).cloned().expect("declared above");
//!
//! FieldBuilder::new("name", &string).build(&cache)?;
//! PropertyBuilder::new("Current", &value).getter().setter().build(&cache)?;
//! MethodBuilder::new("Map")
//!     .generic_params(&["TResult"])
//!     .parameter("input", &value)
//!     .returns(ParamType::MethodGeneric(0))
//!     .build(&cache)?;
//! MethodBuilder::constructor().parameter("name", &string).build(&cache)?;
//!
//! assert_eq!(cache.methods.count(), 4);
//! # Ok::<(), attrscope::Error>(())
//! ```

use std::sync::Arc;

use crate::{
    metadata::{
        customattributes::CustomAttributeRc,
        introspection::TypeHandle,
        token::TableId,
        typesystem::{
            members::MethodShape, CilEvent, CilEventRc, CilField, CilFieldRc, CilFlavor,
            CilMethod, CilMethodRc, CilPrimitiveKind, CilProperty, CilPropertyRc, CilType,
            CilTypeRc, CilTypeRef, CustomAttributeList, MethodModifiers, ParamType,
            TypeModifiers, TypeRegistry,
        },
    },
    Error::TypeError,
    Result,
};

fn attribute_list(attributes: Vec<CustomAttributeRc>) -> CustomAttributeList {
    let list = boxcar::Vec::new();
    for attribute in attributes {
        list.push(attribute);
    }
    Arc::new(list)
}

fn owning_registry(declaring: &CilTypeRc) -> Result<Arc<TypeRegistry>> {
    if !declaring.is_definition() {
        return Err(TypeError(format!(
            "Members can only be declared on type definitions, not on '{}'",
            declaring.fullname()
        )));
    }

    declaring
        .registry()
        .ok_or_else(|| TypeError(format!("'{}' is no longer registered", declaring.fullname())))
}

/// Provides a fluent API for building type definitions
pub struct TypeBuilder {
    flavor: CilFlavor,
    namespace: String,
    name: String,
    modifiers: TypeModifiers,
    base: Option<CilTypeRc>,
    interfaces: Vec<CilTypeRc>,
    generic_params: Vec<String>,
    enclosing: Option<CilTypeRc>,
    attributes: Vec<CustomAttributeRc>,
}

impl TypeBuilder {
    fn new(flavor: CilFlavor, namespace: &str, name: &str) -> Self {
        TypeBuilder {
            flavor,
            namespace: namespace.to_string(),
            name: name.to_string(),
            modifiers: TypeModifiers::empty(),
            base: None,
            interfaces: Vec::new(),
            generic_params: Vec::new(),
            enclosing: None,
            attributes: Vec::new(),
        }
    }

    /// Start a class definition; the base defaults to System.Object
    ///
    /// ## Arguments
    /// * 'namespace' - The namespace (may be empty)
    /// * 'name'      - The simple name
    #[must_use]
    pub fn class(namespace: &str, name: &str) -> Self {
        TypeBuilder::new(CilFlavor::Class, namespace, name)
    }

    /// Start an interface definition
    ///
    /// ## Arguments
    /// * 'namespace' - The namespace (may be empty)
    /// * 'name'      - The simple name
    #[must_use]
    pub fn interface(namespace: &str, name: &str) -> Self {
        let mut builder = TypeBuilder::new(CilFlavor::Interface, namespace, name);
        builder.modifiers |= TypeModifiers::ABSTRACT;
        builder
    }

    /// Start a value type definition; the base is System.ValueType
    ///
    /// ## Arguments
    /// * 'namespace' - The namespace (may be empty)
    /// * 'name'      - The simple name
    #[must_use]
    pub fn value_type(namespace: &str, name: &str) -> Self {
        let mut builder = TypeBuilder::new(CilFlavor::ValueType, namespace, name);
        builder.modifiers |= TypeModifiers::SEALED;
        builder
    }

    /// Set the base type
    #[must_use]
    pub fn extends(mut self, base: &CilTypeRc) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Declare an implemented interface
    #[must_use]
    pub fn implements(mut self, interface: &CilTypeRc) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    /// Declare generic parameters, making this a generic type definition
    #[must_use]
    pub fn generic_params(mut self, names: &[&str]) -> Self {
        self.generic_params
            .extend(names.iter().map(ToString::to_string));
        self
    }

    /// Nest the type inside `outer`
    #[must_use]
    pub fn nested_in(mut self, outer: &CilTypeRc) -> Self {
        self.enclosing = Some(outer.clone());
        self
    }

    /// Mark the type abstract
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.modifiers |= TypeModifiers::ABSTRACT;
        self
    }

    /// Mark the type sealed
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.modifiers |= TypeModifiers::SEALED;
        self
    }

    /// Declare a native attribute on the type
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttributeRc) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Create the type and register it
    ///
    /// ## Arguments
    /// * 'registry' - The registry that will own the type
    ///
    /// # Errors
    /// Returns an error if the name is empty or already registered, if the base type is an
    /// interface or sealed, if an interface is given a base type, or if a declared interface
    /// is not an interface.
    pub fn build(self, registry: &Arc<TypeRegistry>) -> Result<CilTypeRc> {
        if self.name.is_empty() {
            return Err(TypeError("Type name must not be empty".to_string()));
        }

        let fullname = if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        };
        if registry.get_by_fullname(&fullname).is_some() {
            return Err(TypeError(format!("Type '{fullname}' is already defined")));
        }

        let base = match (&self.base, self.flavor) {
            (Some(_), CilFlavor::Interface) => {
                return Err(TypeError(format!(
                    "Interface '{fullname}' cannot have a base type"
                )))
            }
            (Some(base), _) => {
                if base.member_source().flavor == CilFlavor::Interface
                    || base.modifiers.contains(TypeModifiers::SEALED)
                {
                    return Err(TypeError(format!(
                        "'{}' cannot be used as base type of '{fullname}'",
                        base.fullname()
                    )));
                }
                Some(base.clone())
            }
            (None, CilFlavor::ValueType) => Some(registry.get_primitive(CilPrimitiveKind::ValueType)?),
            (None, CilFlavor::Class) => Some(registry.get_primitive(CilPrimitiveKind::Object)?),
            (None, _) => None,
        };

        if let Some(invalid) = self
            .interfaces
            .iter()
            .find(|interface| interface.member_source().flavor != CilFlavor::Interface)
        {
            return Err(TypeError(format!(
                "'{}' is not an interface",
                invalid.fullname()
            )));
        }

        let token = registry.next_token(TableId::TypeDef);
        let handle = registry.definition_handle(token);
        let mut new_type = CilType::new(
            token,
            self.flavor,
            self.namespace,
            self.name,
            handle.clone(),
            registry.weak(),
        );
        new_type.modifiers = self.modifiers;
        let new_type = Arc::new(new_type);

        if let Some(base) = &base {
            new_type.set_base(base)?;
        }
        for interface in &self.interfaces {
            new_type.interfaces.push(CilTypeRef::new(interface));
        }
        for (position, name) in self.generic_params.iter().enumerate() {
            let param_handle = TypeHandle::TypeParameter {
                owner: Box::new(handle.clone()),
                position: u16::try_from(position)
                    .map_err(|_| TypeError("Too many generic parameters".to_string()))?,
            };
            new_type
                .generic_params
                .push(registry.create_generic_parameter(name, param_handle)?);
        }
        for attribute in self.attributes {
            new_type.add_custom_attribute(attribute);
        }
        if let Some(outer) = &self.enclosing {
            new_type.set_enclosing(outer)?;
            outer.nested_types.push(CilTypeRef::new(&new_type));
        }

        registry.insert(&new_type)?;
        Ok(new_type)
    }
}

/// Provides a fluent API for declaring methods and constructors
pub struct MethodBuilder {
    name: String,
    modifiers: MethodModifiers,
    constructor: bool,
    generic_params: Vec<String>,
    params: Vec<(String, ParamType, Vec<CustomAttributeRc>)>,
    return_type: Option<ParamType>,
    return_attributes: Vec<CustomAttributeRc>,
    attributes: Vec<CustomAttributeRc>,
    orphan_attribute: bool,
}

impl MethodBuilder {
    /// Start a method declaration
    ///
    /// ## Arguments
    /// * 'name' - The method name
    #[must_use]
    pub fn new(name: &str) -> Self {
        MethodBuilder {
            name: name.to_string(),
            modifiers: MethodModifiers::empty(),
            constructor: false,
            generic_params: Vec::new(),
            params: Vec::new(),
            return_type: None,
            return_attributes: Vec::new(),
            attributes: Vec::new(),
            orphan_attribute: false,
        }
    }

    /// Start a constructor declaration
    #[must_use]
    pub fn constructor() -> Self {
        let mut builder = MethodBuilder::new(".ctor");
        builder.constructor = true;
        builder
    }

    /// Add method modifiers
    #[must_use]
    pub fn modifiers(mut self, modifiers: MethodModifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// Declare generic parameters, making this a generic method definition
    #[must_use]
    pub fn generic_params(mut self, names: &[&str]) -> Self {
        self.generic_params
            .extend(names.iter().map(ToString::to_string));
        self
    }

    /// Append a parameter
    ///
    /// ## Arguments
    /// * 'name'       - The parameter name
    /// * 'param_type' - The parameter type
    #[must_use]
    pub fn parameter(mut self, name: &str, param_type: impl Into<ParamType>) -> Self {
        self.params
            .push((name.to_string(), param_type.into(), Vec::new()));
        self
    }

    /// Declare a native attribute on the most recently added parameter
    #[must_use]
    pub fn parameter_attribute(mut self, attribute: CustomAttributeRc) -> Self {
        match self.params.last_mut() {
            Some((_, _, attributes)) => attributes.push(attribute),
            None => self.orphan_attribute = true,
        }
        self
    }

    /// Set the return type; methods without one return `void`
    #[must_use]
    pub fn returns(mut self, return_type: impl Into<ParamType>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// Declare a native attribute on the return value
    #[must_use]
    pub fn return_attribute(mut self, attribute: CustomAttributeRc) -> Self {
        self.return_attributes.push(attribute);
        self
    }

    /// Declare a native attribute on the method
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttributeRc) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Create the method and add it to `declaring`
    ///
    /// ## Arguments
    /// * 'declaring' - The type definition declaring the method
    ///
    /// # Errors
    /// Returns an error if the name is empty, `declaring` is not a definition, a constructor
    /// declares generic parameters, a parameter attribute precedes every parameter, or a
    /// parameter type cannot be resolved.
    pub fn build(self, declaring: &CilTypeRc) -> Result<CilMethodRc> {
        if self.name.is_empty() {
            return Err(TypeError("Method name must not be empty".to_string()));
        }
        if self.constructor && !self.generic_params.is_empty() {
            return Err(TypeError("Constructors cannot be generic".to_string()));
        }
        if self.orphan_attribute {
            return Err(TypeError(format!(
                "Parameter attribute on '{}' declared before any parameter",
                self.name
            )));
        }

        let registry = owning_registry(declaring)?;
        let token = registry.next_token(TableId::MethodDef);

        let generic_params = self
            .generic_params
            .iter()
            .enumerate()
            .map(|(position, name)| {
                let handle = TypeHandle::MethodParameter {
                    method: Some(token),
                    position: u16::try_from(position)
                        .map_err(|_| TypeError("Too many generic parameters".to_string()))?,
                };
                registry.create_generic_parameter(name, handle)
            })
            .collect::<Result<Vec<_>>>()?;

        let params = self
            .params
            .into_iter()
            .map(|(name, param_type, attributes)| {
                Ok((
                    Some(name),
                    Some(param_type.resolve(&registry, &generic_params)?),
                    attribute_list(attributes),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let void = CilPrimitiveKind::Void.token();
        let return_type = match &self.return_type {
            Some(return_type) => Some(return_type.resolve(&registry, &generic_params)?)
                .filter(|ty| ty.token != void),
            None => None,
        };

        let method = CilMethod::from_shape(MethodShape {
            token,
            name: self.name,
            modifiers: self.modifiers,
            constructor: self.constructor,
            declaring: CilTypeRef::new(declaring),
            params,
            return_type,
            return_attributes: attribute_list(self.return_attributes),
            generic_params,
            generic_args: Vec::new(),
            generic_definition: None,
            custom_attributes: attribute_list(self.attributes),
        });

        declaring.methods.push(method.clone());
        Ok(method)
    }
}

/// Provides a fluent API for declaring fields
pub struct FieldBuilder {
    name: String,
    field_type: CilTypeRc,
    is_static: bool,
    attributes: Vec<CustomAttributeRc>,
}

impl FieldBuilder {
    /// Start a field declaration
    ///
    /// ## Arguments
    /// * 'name'       - The field name
    /// * 'field_type' - The field type
    #[must_use]
    pub fn new(name: &str, field_type: &CilTypeRc) -> Self {
        FieldBuilder {
            name: name.to_string(),
            field_type: field_type.clone(),
            is_static: false,
            attributes: Vec::new(),
        }
    }

    /// Make the field static
    #[must_use]
    pub fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Declare a native attribute on the field
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttributeRc) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Create the field and add it to `declaring`
    ///
    /// # Errors
    /// Returns an error if the name is empty or `declaring` is not a definition.
    pub fn build(self, declaring: &CilTypeRc) -> Result<CilFieldRc> {
        if self.name.is_empty() {
            return Err(TypeError("Field name must not be empty".to_string()));
        }

        let registry = owning_registry(declaring)?;
        let field = Arc::new(CilField {
            token: registry.next_token(TableId::Field),
            name: self.name,
            field_type: self.field_type,
            is_static: self.is_static,
            declaring: CilTypeRef::new(declaring),
            custom_attributes: attribute_list(self.attributes),
        });

        declaring.fields.push(field.clone());
        Ok(field)
    }
}

/// Provides a fluent API for declaring properties together with their accessors
///
/// Accessors are named `get_<Name>` and `set_<Name>` and are added to the declaring type's
/// methods. A property declared without accessors gets a getter.
pub struct PropertyBuilder {
    name: String,
    property_type: CilTypeRc,
    getter: bool,
    setter: bool,
    modifiers: MethodModifiers,
    attributes: Vec<CustomAttributeRc>,
}

impl PropertyBuilder {
    /// Start a property declaration
    ///
    /// ## Arguments
    /// * 'name'          - The property name
    /// * 'property_type' - The property type
    #[must_use]
    pub fn new(name: &str, property_type: &CilTypeRc) -> Self {
        PropertyBuilder {
            name: name.to_string(),
            property_type: property_type.clone(),
            getter: false,
            setter: false,
            modifiers: MethodModifiers::empty(),
            attributes: Vec::new(),
        }
    }

    /// Declare a get accessor
    #[must_use]
    pub fn getter(mut self) -> Self {
        self.getter = true;
        self
    }

    /// Declare a set accessor
    #[must_use]
    pub fn setter(mut self) -> Self {
        self.setter = true;
        self
    }

    /// Modifiers applied to every accessor
    #[must_use]
    pub fn modifiers(mut self, modifiers: MethodModifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// Declare a native attribute on the property
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttributeRc) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Create the property and its accessors and add them to `declaring`
    ///
    /// # Errors
    /// Returns an error if the name is empty or `declaring` is not a definition.
    pub fn build(self, declaring: &CilTypeRc) -> Result<CilPropertyRc> {
        if self.name.is_empty() {
            return Err(TypeError("Property name must not be empty".to_string()));
        }
        let registry = owning_registry(declaring)?;

        let getter = if self.getter || !self.setter {
            Some(
                MethodBuilder::new(&format!("get_{}", self.name))
                    .modifiers(self.modifiers)
                    .returns(&self.property_type)
                    .build(declaring)?,
            )
        } else {
            None
        };
        let setter = if self.setter {
            Some(
                MethodBuilder::new(&format!("set_{}", self.name))
                    .modifiers(self.modifiers)
                    .parameter("value", &self.property_type)
                    .build(declaring)?,
            )
        } else {
            None
        };

        let property = Arc::new(CilProperty {
            token: registry.next_token(TableId::Property),
            name: self.name,
            property_type: self.property_type,
            getter,
            setter,
            declaring: CilTypeRef::new(declaring),
            custom_attributes: attribute_list(self.attributes),
        });

        declaring.properties.push(property.clone());
        Ok(property)
    }
}

/// Provides a fluent API for declaring events together with their accessors
///
/// Accessors are named `add_<Name>` and `remove_<Name>` and take the handler as `value`.
pub struct EventBuilder {
    name: String,
    handler_type: CilTypeRc,
    modifiers: MethodModifiers,
    attributes: Vec<CustomAttributeRc>,
}

impl EventBuilder {
    /// Start an event declaration
    ///
    /// ## Arguments
    /// * 'name'         - The event name
    /// * 'handler_type' - The delegate type of the event
    #[must_use]
    pub fn new(name: &str, handler_type: &CilTypeRc) -> Self {
        EventBuilder {
            name: name.to_string(),
            handler_type: handler_type.clone(),
            modifiers: MethodModifiers::empty(),
            attributes: Vec::new(),
        }
    }

    /// Modifiers applied to both accessors
    #[must_use]
    pub fn modifiers(mut self, modifiers: MethodModifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// Declare a native attribute on the event
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttributeRc) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Create the event and its accessors and add them to `declaring`
    ///
    /// # Errors
    /// Returns an error if the name is empty or `declaring` is not a definition.
    pub fn build(self, declaring: &CilTypeRc) -> Result<CilEventRc> {
        if self.name.is_empty() {
            return Err(TypeError("Event name must not be empty".to_string()));
        }
        let registry = owning_registry(declaring)?;

        let add_method = MethodBuilder::new(&format!("add_{}", self.name))
            .modifiers(self.modifiers)
            .parameter("value", &self.handler_type)
            .build(declaring)?;
        let remove_method = MethodBuilder::new(&format!("remove_{}", self.name))
            .modifiers(self.modifiers)
            .parameter("value", &self.handler_type)
            .build(declaring)?;

        let event = Arc::new(CilEvent {
            token: registry.next_token(TableId::Event),
            name: self.name,
            handler_type: Some(self.handler_type),
            add_method: Some(add_method),
            remove_method: Some(remove_method),
            declaring: CilTypeRef::new(declaring),
            custom_attributes: attribute_list(self.attributes),
        });

        declaring.events.push(event.clone());
        Ok(event)
    }
}
