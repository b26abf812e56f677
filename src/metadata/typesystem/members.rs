//! Members of a [`CilType`]: methods, parameters, fields, properties and events.
//!
//! Members keep a weak link to their declaring type and are owned by its member lists.
//! Parameters keep a weak link to their method. Generic instances of a type expose the
//! members of the generic definition directly, with their open signatures.
//!
//! # Override Relation
//!
//! A method overrides a base method when it is virtual, neither static nor `NEW_SLOT`, and a
//! base type in its chain declares a virtual instance method with the same name, the same
//! generic arity and the same parameter types. The nearest such base method wins. Type
//! parameters of generic base types are bound through the instantiation the derived type
//! extends. Properties and events override through their accessors.

use std::{
    fmt, iter,
    sync::{Arc, Weak},
};

use bitflags::bitflags;

use crate::{
    metadata::{
        customattributes::{merge_inherited, CustomAttributeRc, MAX_INHERITANCE_DEPTH},
        introspection::{
            AttributeProvider, ElementKind, EventInfo, EventRc, FieldInfo, MemberInfo, MethodInfo,
            MethodRc, ParameterInfo, ParameterRc, PropertyInfo, PropertyRc, TypeHandle, TypeRc,
        },
        token::Token,
        typesystem::{CilFlavor, CilTypeRc, CilTypeRef, CustomAttributeList, TypeRegistry},
    },
    Error::TypeError,
    Result,
};

/// Reference to a `CilMethod`
pub type CilMethodRc = Arc<CilMethod>;
/// Reference to a `CilParam`
pub type CilParamRc = Arc<CilParam>;
/// Reference to a `CilField`
pub type CilFieldRc = Arc<CilField>;
/// Reference to a `CilProperty`
pub type CilPropertyRc = Arc<CilProperty>;
/// Reference to a `CilEvent`
pub type CilEventRc = Arc<CilEvent>;

bitflags! {
    /// Method modifiers, using the `MethodAttributes` bit values
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodModifiers: u32 {
        /// Defined on the type rather than per instance
        const STATIC = 0x0010;
        /// Dispatched through a virtual slot
        const VIRTUAL = 0x0040;
        /// Always gets a new slot, shadowing any base method
        const NEW_SLOT = 0x0100;
        /// Has no implementation
        const ABSTRACT = 0x0400;
    }
}

/// A parameter or return type as written in a member declaration.
///
/// Generic method parameters do not exist before the method is built, so declarations refer
/// to them by position and the builder resolves them.
#[derive(Debug, Clone)]
pub enum ParamType {
    /// An existing type
    Type(CilTypeRc),
    /// The generic parameter of the declared method at the given position
    MethodGeneric(u16),
    /// A single-dimensional array of the inner type
    Array(Box<ParamType>),
    /// A managed reference to the inner type
    ByRef(Box<ParamType>),
    /// A generic type definition instantiated with the given arguments
    Instance(CilTypeRc, Vec<ParamType>),
}

impl ParamType {
    /// Resolve the declaration into a type
    ///
    /// ## Arguments
    /// * 'registry'       - Registry used to construct arrays, by-refs and generic instances
    /// * 'method_generic' - The generic parameters of the method being built
    ///
    /// # Errors
    /// Returns an error for an out-of-range generic parameter position or an invalid generic
    /// instantiation.
    pub fn resolve(
        &self,
        registry: &TypeRegistry,
        method_generic: &[CilTypeRc],
    ) -> Result<CilTypeRc> {
        match self {
            ParamType::Type(ty) => Ok(ty.clone()),
            ParamType::MethodGeneric(position) => method_generic
                .get(usize::from(*position))
                .cloned()
                .ok_or_else(|| {
                    TypeError(format!(
                        "Generic method parameter !!{position} is not declared"
                    ))
                }),
            ParamType::Array(inner) => {
                let element = inner.resolve(registry, method_generic)?;
                Ok(registry.make_array(&element))
            }
            ParamType::ByRef(inner) => {
                let element = inner.resolve(registry, method_generic)?;
                Ok(registry.make_by_ref(&element))
            }
            ParamType::Instance(definition, arguments) => {
                let arguments = arguments
                    .iter()
                    .map(|arg| arg.resolve(registry, method_generic))
                    .collect::<Result<Vec<_>>>()?;
                registry.make_generic_instance(definition, &arguments)
            }
        }
    }
}

impl From<&CilTypeRc> for ParamType {
    fn from(ty: &CilTypeRc) -> Self {
        ParamType::Type(ty.clone())
    }
}

impl From<CilTypeRc> for ParamType {
    fn from(ty: CilTypeRc) -> Self {
        ParamType::Type(ty)
    }
}

/// A method parameter or the return value slot (position -1)
pub struct CilParam {
    /// Parameter name, `None` for the return value
    pub name: Option<String>,
    /// Zero-based position, -1 for the return value
    pub position: i32,
    /// Declared type, `None` for a `void` return
    pub param_type: Option<CilTypeRc>,
    /// The declaring method
    method: Weak<CilMethod>,
    /// All custom attributes this parameter has
    pub custom_attributes: CustomAttributeList,
}

impl CilParam {
    /// The declaring method, if it is still alive
    #[must_use]
    pub fn method(&self) -> Option<CilMethodRc> {
        self.method.upgrade()
    }

    /// Add a custom attribute to this parameter
    pub fn add_custom_attribute(&self, attribute: CustomAttributeRc) {
        self.custom_attributes.push(attribute);
    }
}

impl fmt::Debug for CilParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CilParam")
            .field("name", &self.name)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl AttributeProvider for CilParam {
    fn custom_attributes(&self, _inherit: bool) -> Vec<CustomAttributeRc> {
        collect(&self.custom_attributes)
    }
}

impl ParameterInfo for CilParam {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn position(&self) -> i32 {
        self.position
    }

    fn parameter_type(&self) -> Option<TypeRc> {
        self.param_type.clone().map(|ty| ty as TypeRc)
    }

    fn member(&self) -> Option<MethodRc> {
        self.method().map(|method| method as MethodRc)
    }
}

/// Everything needed to materialize a method; parameters are created together with the method
/// so they can link back to it.
pub(crate) struct MethodShape {
    pub token: Token,
    pub name: String,
    pub modifiers: MethodModifiers,
    pub constructor: bool,
    pub declaring: CilTypeRef,
    pub params: Vec<(Option<String>, Option<CilTypeRc>, CustomAttributeList)>,
    pub return_type: Option<CilTypeRc>,
    pub return_attributes: CustomAttributeList,
    pub generic_params: Vec<CilTypeRc>,
    pub generic_args: Vec<CilTypeRc>,
    pub generic_definition: Option<CilMethodRc>,
    pub custom_attributes: CustomAttributeList,
}

/// A method or constructor
pub struct CilMethod {
    /// Token of the method definition
    pub token: Token,
    /// Method name, `.ctor` for constructors
    pub name: String,
    /// Virtual / static / abstract / new-slot modifiers
    pub modifiers: MethodModifiers,
    constructor: bool,
    declaring: CilTypeRef,
    params: Vec<CilParamRc>,
    return_param: CilParamRc,
    /// Generic parameters of a generic method definition
    pub generic_params: Vec<CilTypeRc>,
    generic_args: Vec<CilTypeRc>,
    generic_definition: Option<CilMethodRc>,
    /// All custom attributes this method has
    pub custom_attributes: CustomAttributeList,
}

impl CilMethod {
    pub(crate) fn from_shape(shape: MethodShape) -> CilMethodRc {
        Arc::new_cyclic(|me: &Weak<CilMethod>| {
            let params = shape
                .params
                .into_iter()
                .enumerate()
                .map(|(position, (name, param_type, custom_attributes))| {
                    Arc::new(CilParam {
                        name,
                        position: i32::try_from(position).unwrap_or(i32::MAX),
                        param_type,
                        method: me.clone(),
                        custom_attributes,
                    })
                })
                .collect();

            let return_param = Arc::new(CilParam {
                name: None,
                position: -1,
                param_type: shape.return_type,
                method: me.clone(),
                custom_attributes: shape.return_attributes,
            });

            CilMethod {
                token: shape.token,
                name: shape.name,
                modifiers: shape.modifiers,
                constructor: shape.constructor,
                declaring: shape.declaring,
                params,
                return_param,
                generic_params: shape.generic_params,
                generic_args: shape.generic_args,
                generic_definition: shape.generic_definition,
                custom_attributes: shape.custom_attributes,
            }
        })
    }

    /// The type declaring this method
    #[must_use]
    pub fn declaring(&self) -> Option<CilTypeRc> {
        self.declaring.upgrade()
    }

    /// Declared parameters, in order
    #[must_use]
    pub fn params(&self) -> &[CilParamRc] {
        &self.params
    }

    /// The return value slot
    #[must_use]
    pub fn return_param(&self) -> &CilParamRc {
        &self.return_param
    }

    /// Returns `true` for constructors
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.constructor
    }

    /// Returns `true` for virtual methods
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.modifiers.contains(MethodModifiers::VIRTUAL)
    }

    /// Returns `true` for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(MethodModifiers::STATIC)
    }

    /// The generic definition of an instantiated generic method
    #[must_use]
    pub fn generic_definition(&self) -> Option<&CilMethodRc> {
        self.generic_definition.as_ref()
    }

    /// Type handles of the declared parameters
    #[must_use]
    pub fn parameter_handles(&self) -> Vec<TypeHandle> {
        self.params
            .iter()
            .filter_map(|param| param.param_type.as_ref().map(|ty| ty.handle.clone()))
            .collect()
    }

    /// Add a custom attribute to this method
    pub fn add_custom_attribute(&self, attribute: CustomAttributeRc) {
        self.custom_attributes.push(attribute);
    }

    /// Attributes declared directly on this method
    #[must_use]
    pub fn declared_attributes(&self) -> Vec<CustomAttributeRc> {
        collect(&self.custom_attributes)
    }

    /// The nearest base method this method overrides
    ///
    /// Instantiated generic methods report the method their definition overrides.
    #[must_use]
    pub fn overridden(&self) -> Option<CilMethodRc> {
        if let Some(definition) = &self.generic_definition {
            return definition.overridden();
        }

        if self.constructor
            || !self.is_virtual()
            || self
                .modifiers
                .intersects(MethodModifiers::NEW_SLOT | MethodModifiers::STATIC)
        {
            return None;
        }

        let declaring = self.declaring()?;
        let signature: Vec<TypeHandle> = self
            .parameter_handles()
            .iter()
            .map(TypeHandle::erase_method_owners)
            .collect();

        let mut current = declaring.base();
        let mut depth = 0;
        while let Some(base) = current {
            if depth >= MAX_INHERITANCE_DEPTH {
                break;
            }
            depth += 1;

            let arguments: Vec<TypeHandle> =
                base.generic_args.iter().map(|arg| arg.handle.clone()).collect();
            let source = base.member_source();

            for (_, candidate) in source.methods.iter() {
                if candidate.name != self.name
                    || candidate.constructor
                    || !candidate.is_virtual()
                    || candidate.is_static()
                    || candidate.generic_params.len() != self.generic_params.len()
                {
                    continue;
                }

                let candidate_signature: Vec<TypeHandle> = candidate
                    .parameter_handles()
                    .iter()
                    .map(|handle| {
                        handle
                            .bind_type_parameters(&source.handle, &arguments)
                            .erase_method_owners()
                    })
                    .collect();

                if candidate_signature == signature {
                    return Some(candidate.clone());
                }
            }

            current = base.base();
        }

        None
    }

    /// Instantiate a generic method definition with type arguments
    ///
    /// The instantiation shares the token and the attribute lists of the definition.
    ///
    /// ## Arguments
    /// * 'arguments' - One type argument per generic parameter
    ///
    /// # Errors
    /// Returns an error if this is not a generic method definition or the argument count does
    /// not match.
    pub fn make_generic(self: &Arc<Self>, arguments: &[CilTypeRc]) -> Result<CilMethodRc> {
        if self.generic_params.is_empty() || self.generic_definition.is_some() {
            return Err(TypeError(format!(
                "'{}' is not a generic method definition",
                self.name
            )));
        }
        if arguments.len() != self.generic_params.len() {
            return Err(TypeError(format!(
                "'{}' expects {} type arguments, got {}",
                self.name,
                self.generic_params.len(),
                arguments.len()
            )));
        }

        let registry = self
            .declaring()
            .and_then(|declaring| declaring.registry())
            .ok_or_else(|| TypeError(format!("'{}' is no longer registered", self.name)))?;

        let substitute = |ty: &Option<CilTypeRc>| -> Result<Option<CilTypeRc>> {
            ty.as_ref()
                .map(|ty| substitute_method_parameters(&registry, ty, self.token, arguments))
                .transpose()
        };

        let params = self
            .params
            .iter()
            .map(|param| {
                Ok((
                    param.name.clone(),
                    substitute(&param.param_type)?,
                    param.custom_attributes.clone(),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CilMethod::from_shape(MethodShape {
            token: self.token,
            name: self.name.clone(),
            modifiers: self.modifiers,
            constructor: self.constructor,
            declaring: self.declaring.clone(),
            params,
            return_type: substitute(&self.return_param.param_type)?,
            return_attributes: self.return_param.custom_attributes.clone(),
            generic_params: Vec::new(),
            generic_args: arguments.to_vec(),
            generic_definition: Some(self.clone()),
            custom_attributes: self.custom_attributes.clone(),
        }))
    }
}

fn substitute_method_parameters(
    registry: &TypeRegistry,
    ty: &CilTypeRc,
    method: Token,
    arguments: &[CilTypeRc],
) -> Result<CilTypeRc> {
    if let TypeHandle::MethodParameter {
        method: Some(owner),
        position,
    } = &ty.handle
    {
        if *owner == method {
            return arguments.get(usize::from(*position)).cloned().ok_or_else(|| {
                TypeError(format!("No type argument for generic parameter !!{position}"))
            });
        }
    }

    match (ty.flavor, ty.element()) {
        (CilFlavor::Array, Some(element)) => Ok(registry.make_array(
            &substitute_method_parameters(registry, element, method, arguments)?,
        )),
        (CilFlavor::ByRef, Some(element)) => Ok(registry.make_by_ref(
            &substitute_method_parameters(registry, element, method, arguments)?,
        )),
        (CilFlavor::GenericInstance, _) => match ty.generic_definition() {
            Some(definition) => {
                let bound = ty
                    .generic_args()
                    .iter()
                    .map(|arg| substitute_method_parameters(registry, arg, method, arguments))
                    .collect::<Result<Vec<_>>>()?;
                registry.make_generic_instance(definition, &bound)
            }
            None => Ok(ty.clone()),
        },
        _ => Ok(ty.clone()),
    }
}

impl fmt::Debug for CilMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CilMethod")
            .field("token", &self.token)
            .field("name", &self.name)
            .field("modifiers", &self.modifiers)
            .finish_non_exhaustive()
    }
}

impl AttributeProvider for CilMethod {
    fn custom_attributes(&self, inherit: bool) -> Vec<CustomAttributeRc> {
        if !inherit || self.constructor {
            return self.declared_attributes();
        }

        let overridden = iter::successors(self.overridden(), |method| method.overridden());
        merge_inherited(
            iter::once(self.declared_attributes())
                .chain(overridden.map(|method| method.declared_attributes())),
            None,
        )
    }
}

impl MemberInfo for CilMethod {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> Token {
        self.token
    }

    fn element_kind(&self) -> ElementKind {
        if self.constructor {
            ElementKind::Constructor
        } else {
            ElementKind::Method
        }
    }

    fn declaring_type(&self) -> Option<TypeRc> {
        self.declaring().map(|ty| ty as TypeRc)
    }
}

impl MethodInfo for CilMethod {
    fn parameters(&self) -> Vec<ParameterRc> {
        self.params
            .iter()
            .map(|param| param.clone() as ParameterRc)
            .collect()
    }

    fn return_parameter(&self) -> ParameterRc {
        self.return_param.clone()
    }

    fn return_type(&self) -> Option<TypeRc> {
        self.return_param
            .param_type
            .clone()
            .map(|ty| ty as TypeRc)
    }

    fn is_virtual(&self) -> bool {
        CilMethod::is_virtual(self)
    }

    fn is_abstract(&self) -> bool {
        self.modifiers.contains(MethodModifiers::ABSTRACT)
    }

    fn is_static(&self) -> bool {
        CilMethod::is_static(self)
    }

    fn is_generic_method_definition(&self) -> bool {
        !self.generic_params.is_empty() && self.generic_definition.is_none()
    }

    fn generic_arguments(&self) -> Vec<TypeRc> {
        let arguments = if self.generic_definition.is_some() {
            &self.generic_args
        } else {
            &self.generic_params
        };
        arguments.iter().map(|arg| arg.clone() as TypeRc).collect()
    }

    fn generic_method_definition(&self) -> Option<MethodRc> {
        self.generic_definition
            .clone()
            .map(|definition| definition as MethodRc)
    }

    fn overridden_method(&self) -> Option<MethodRc> {
        self.overridden().map(|method| method as MethodRc)
    }
}

/// A field
pub struct CilField {
    /// Token of the field definition
    pub token: Token,
    /// Field name
    pub name: String,
    /// Declared field type
    pub field_type: CilTypeRc,
    /// Defined on the type rather than per instance
    pub is_static: bool,
    pub(crate) declaring: CilTypeRef,
    /// All custom attributes this field has
    pub custom_attributes: CustomAttributeList,
}

impl CilField {
    /// Add a custom attribute to this field
    pub fn add_custom_attribute(&self, attribute: CustomAttributeRc) {
        self.custom_attributes.push(attribute);
    }
}

impl fmt::Debug for CilField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CilField")
            .field("token", &self.token)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AttributeProvider for CilField {
    fn custom_attributes(&self, _inherit: bool) -> Vec<CustomAttributeRc> {
        collect(&self.custom_attributes)
    }
}

impl MemberInfo for CilField {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> Token {
        self.token
    }

    fn element_kind(&self) -> ElementKind {
        ElementKind::Field
    }

    fn declaring_type(&self) -> Option<TypeRc> {
        self.declaring.upgrade().map(|ty| ty as TypeRc)
    }
}

impl FieldInfo for CilField {
    fn field_type(&self) -> TypeRc {
        self.field_type.clone()
    }

    fn is_static(&self) -> bool {
        self.is_static
    }
}

/// A property with its accessors
pub struct CilProperty {
    /// Token of the property definition
    pub token: Token,
    /// Property name
    pub name: String,
    /// Declared property type
    pub property_type: CilTypeRc,
    /// The get accessor
    pub getter: Option<CilMethodRc>,
    /// The set accessor
    pub setter: Option<CilMethodRc>,
    pub(crate) declaring: CilTypeRef,
    /// All custom attributes this property has
    pub custom_attributes: CustomAttributeList,
}

impl CilProperty {
    /// Add a custom attribute to this property
    pub fn add_custom_attribute(&self, attribute: CustomAttributeRc) {
        self.custom_attributes.push(attribute);
    }

    /// The base property whose accessor this property's accessor overrides
    #[must_use]
    pub fn overridden(&self) -> Option<CilPropertyRc> {
        let accessor = self.getter.as_ref().or(self.setter.as_ref())?;
        let base_accessor = accessor.overridden()?;
        let base_type = base_accessor.declaring()?;

        base_type
            .properties
            .iter()
            .find(|(_, property)| {
                [&property.getter, &property.setter]
                    .into_iter()
                    .flatten()
                    .any(|method| method.token == base_accessor.token)
            })
            .map(|(_, property)| property.clone())
    }
}

impl fmt::Debug for CilProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CilProperty")
            .field("token", &self.token)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AttributeProvider for CilProperty {
    fn custom_attributes(&self, inherit: bool) -> Vec<CustomAttributeRc> {
        if !inherit {
            return collect(&self.custom_attributes);
        }

        let overridden = iter::successors(self.overridden(), |property| property.overridden());
        merge_inherited(
            iter::once(collect(&self.custom_attributes))
                .chain(overridden.map(|property| collect(&property.custom_attributes))),
            None,
        )
    }
}

impl MemberInfo for CilProperty {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> Token {
        self.token
    }

    fn element_kind(&self) -> ElementKind {
        ElementKind::Property
    }

    fn declaring_type(&self) -> Option<TypeRc> {
        self.declaring.upgrade().map(|ty| ty as TypeRc)
    }
}

impl PropertyInfo for CilProperty {
    fn property_type(&self) -> TypeRc {
        self.property_type.clone()
    }

    fn getter(&self) -> Option<MethodRc> {
        self.getter.clone().map(|method| method as MethodRc)
    }

    fn setter(&self) -> Option<MethodRc> {
        self.setter.clone().map(|method| method as MethodRc)
    }

    fn overridden_property(&self) -> Option<PropertyRc> {
        self.overridden().map(|property| property as PropertyRc)
    }
}

/// An event with its accessors
pub struct CilEvent {
    /// Token of the event definition
    pub token: Token,
    /// Event name
    pub name: String,
    /// The delegate type of the event
    pub handler_type: Option<CilTypeRc>,
    /// The add accessor
    pub add_method: Option<CilMethodRc>,
    /// The remove accessor
    pub remove_method: Option<CilMethodRc>,
    pub(crate) declaring: CilTypeRef,
    /// All custom attributes this event has
    pub custom_attributes: CustomAttributeList,
}

impl CilEvent {
    /// Add a custom attribute to this event
    pub fn add_custom_attribute(&self, attribute: CustomAttributeRc) {
        self.custom_attributes.push(attribute);
    }

    /// The base event whose accessor this event's accessor overrides
    #[must_use]
    pub fn overridden(&self) -> Option<CilEventRc> {
        let accessor = self.add_method.as_ref().or(self.remove_method.as_ref())?;
        let base_accessor = accessor.overridden()?;
        let base_type = base_accessor.declaring()?;

        base_type
            .events
            .iter()
            .find(|(_, event)| {
                [&event.add_method, &event.remove_method]
                    .into_iter()
                    .flatten()
                    .any(|method| method.token == base_accessor.token)
            })
            .map(|(_, event)| event.clone())
    }
}

impl fmt::Debug for CilEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CilEvent")
            .field("token", &self.token)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AttributeProvider for CilEvent {
    fn custom_attributes(&self, inherit: bool) -> Vec<CustomAttributeRc> {
        if !inherit {
            return collect(&self.custom_attributes);
        }

        let overridden = iter::successors(self.overridden(), |event| event.overridden());
        merge_inherited(
            iter::once(collect(&self.custom_attributes))
                .chain(overridden.map(|event| collect(&event.custom_attributes))),
            None,
        )
    }
}

impl MemberInfo for CilEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> Token {
        self.token
    }

    fn element_kind(&self) -> ElementKind {
        ElementKind::Event
    }

    fn declaring_type(&self) -> Option<TypeRc> {
        self.declaring.upgrade().map(|ty| ty as TypeRc)
    }
}

impl EventInfo for CilEvent {
    fn handler_type(&self) -> Option<TypeRc> {
        self.handler_type.clone().map(|ty| ty as TypeRc)
    }

    fn add_method(&self) -> Option<MethodRc> {
        self.add_method.clone().map(|method| method as MethodRc)
    }

    fn remove_method(&self) -> Option<MethodRc> {
        self.remove_method.clone().map(|method| method as MethodRc)
    }

    fn overridden_event(&self) -> Option<EventRc> {
        self.overridden().map(|event| event as EventRc)
    }
}

fn collect(list: &CustomAttributeList) -> Vec<CustomAttributeRc> {
    list.iter().map(|(_, attr)| attr.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        customattributes::{AttributeKind, AttributeUsage, CustomAttribute},
        introspection::TypeInfo,
        typesystem::{
            CilPrimitiveKind, EventBuilder, MethodBuilder, PropertyBuilder, TypeBuilder,
        },
    };

    #[test]
    fn test_override_and_new_slot() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();

        let base = TypeBuilder::class("Tests", "Base").build(&registry).unwrap();
        let base_run = MethodBuilder::new("Run")
            .modifiers(MethodModifiers::VIRTUAL | MethodModifiers::NEW_SLOT)
            .parameter("count", &int32)
            .build(&base)
            .unwrap();

        let derived = TypeBuilder::class("Tests", "Derived")
            .extends(&base)
            .build(&registry)
            .unwrap();
        let derived_run = MethodBuilder::new("Run")
            .modifiers(MethodModifiers::VIRTUAL)
            .parameter("count", &int32)
            .build(&derived)
            .unwrap();

        let hiding = TypeBuilder::class("Tests", "Hiding")
            .extends(&derived)
            .build(&registry)
            .unwrap();
        let hiding_run = MethodBuilder::new("Run")
            .modifiers(MethodModifiers::VIRTUAL | MethodModifiers::NEW_SLOT)
            .parameter("count", &int32)
            .build(&hiding)
            .unwrap();

        assert!(base_run.overridden().is_none());
        assert_eq!(derived_run.overridden().map(|m| m.token), Some(base_run.token));
        assert!(hiding_run.overridden().is_none());
    }

    #[test]
    fn test_overload_does_not_override() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let string = registry.get_primitive(CilPrimitiveKind::String).unwrap();

        let base = TypeBuilder::class("Tests", "Base").build(&registry).unwrap();
        MethodBuilder::new("Add")
            .modifiers(MethodModifiers::VIRTUAL | MethodModifiers::NEW_SLOT)
            .parameter("value", &int32)
            .build(&base)
            .unwrap();

        let derived = TypeBuilder::class("Tests", "Derived")
            .extends(&base)
            .build(&registry)
            .unwrap();
        let add_string = MethodBuilder::new("Add")
            .modifiers(MethodModifiers::VIRTUAL)
            .parameter("value", &string)
            .build(&derived)
            .unwrap();

        assert!(add_string.overridden().is_none());
    }

    #[test]
    fn test_override_through_generic_base() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();

        let repository = TypeBuilder::class("Tests", "Repository`1")
            .generic_params(&["T"])
            .build(&registry)
            .unwrap();
        let t = repository.generic_params.get(0).unwrap().clone();
        let save = MethodBuilder::new("Save")
            .modifiers(MethodModifiers::VIRTUAL | MethodModifiers::NEW_SLOT)
            .parameter("item", &t)
            .build(&repository)
            .unwrap();

        let of_int = registry
            .make_generic_instance(&repository, &[int32.clone()])
            .unwrap();
        let numbers = TypeBuilder::class("Tests", "Numbers")
            .extends(&of_int)
            .build(&registry)
            .unwrap();
        let numbers_save = MethodBuilder::new("Save")
            .modifiers(MethodModifiers::VIRTUAL)
            .parameter("item", &int32)
            .build(&numbers)
            .unwrap();

        assert_eq!(numbers_save.overridden().map(|m| m.token), Some(save.token));
    }

    #[test]
    fn test_generic_method_instantiation() {
        let registry = TypeRegistry::new("Tests");
        let string = registry.get_primitive(CilPrimitiveKind::String).unwrap();
        let host = TypeBuilder::class("Tests", "Host").build(&registry).unwrap();

        let convert = MethodBuilder::new("Convert")
            .generic_params(&["U"])
            .parameter("input", ParamType::MethodGeneric(0))
            .parameter(
                "batch",
                ParamType::Array(Box::new(ParamType::MethodGeneric(0))),
            )
            .returns(ParamType::MethodGeneric(0))
            .build(&host)
            .unwrap();
        let kind = AttributeKind::new("Tests", "Marker").into_rc();
        convert.add_custom_attribute(CustomAttribute::new(&kind).into_rc());

        let of_string = convert.make_generic(&[string.clone()]).unwrap();
        assert!(convert.is_generic_method_definition());
        assert!(!of_string.is_generic_method_definition());
        assert!(of_string.is_generic_method());
        assert_eq!(of_string.token, convert.token);
        assert_eq!(of_string.params()[0].param_type.as_ref().unwrap().fullname(), "System.String");
        assert_eq!(of_string.params()[1].param_type.as_ref().unwrap().name, "String[]");
        assert_eq!(of_string.return_type().unwrap().full_name(), "System.String");
        assert_eq!(of_string.declared_attributes().len(), 1);

        assert!(of_string.make_generic(&[string.clone()]).is_err());
        assert!(convert.make_generic(&[]).is_err());
    }

    #[test]
    fn test_property_and_event_override_through_accessors() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let delegate = registry.get_primitive(CilPrimitiveKind::Delegate).unwrap();
        let inherited = AttributeKind::new("Tests", "Tracked")
            .with_usage(AttributeUsage::new(true, false))
            .into_rc();

        let base = TypeBuilder::class("Tests", "Base").build(&registry).unwrap();
        let base_size = PropertyBuilder::new("Size", &int32)
            .getter()
            .setter()
            .modifiers(MethodModifiers::VIRTUAL | MethodModifiers::NEW_SLOT)
            .attribute(CustomAttribute::new(&inherited).into_rc())
            .build(&base)
            .unwrap();
        let base_changed = EventBuilder::new("Changed", &delegate)
            .modifiers(MethodModifiers::VIRTUAL | MethodModifiers::NEW_SLOT)
            .attribute(CustomAttribute::new(&inherited).into_rc())
            .build(&base)
            .unwrap();

        let derived = TypeBuilder::class("Tests", "Derived")
            .extends(&base)
            .build(&registry)
            .unwrap();
        let size = PropertyBuilder::new("Size", &int32)
            .getter()
            .modifiers(MethodModifiers::VIRTUAL)
            .build(&derived)
            .unwrap();
        let changed = EventBuilder::new("Changed", &delegate)
            .modifiers(MethodModifiers::VIRTUAL)
            .build(&derived)
            .unwrap();

        assert_eq!(size.overridden().map(|p| p.token), Some(base_size.token));
        assert_eq!(changed.overridden().map(|e| e.token), Some(base_changed.token));
        assert!(size.custom_attributes(false).is_empty());
        assert_eq!(size.custom_attributes(true).len(), 1);
        assert_eq!(changed.custom_attributes(true).len(), 1);
        assert_eq!(derived.properties().len(), 1);
        assert_eq!(derived.methods_named("get_Size").len(), 1);
    }

    #[test]
    fn test_parameter_links_back_to_method() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let host = TypeBuilder::class("Tests", "Host").build(&registry).unwrap();
        let method = MethodBuilder::new("Set")
            .parameter("value", &int32)
            .build(&host)
            .unwrap();

        let param = method.params()[0].clone();
        assert_eq!(param.position, 0);
        assert_eq!(ParameterInfo::element_kind(param.as_ref()), ElementKind::Parameter);
        assert_eq!(param.member().map(|m| m.token()), Some(method.token));
        assert_eq!(method.return_param().position, -1);
        assert!(method.return_type().is_none());
    }
}
