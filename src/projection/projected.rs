//! The generic projected wrapper and its capability implementations.
//!
//! [`Projected<T, P>`] wraps one host element `Arc<T>` where `T` is one of the introspection
//! trait objects. Non-attribute operations are forwarded to the host element; anything they
//! return that is itself a program element is wrapped with the same projection.

use std::{fmt, sync::Arc};

use crate::{
    metadata::{
        customattributes::{AttributeKind, CustomAttributeRc},
        introspection::{
            AssemblyInfo, AssemblyRc, AttributeProvider, ElementKind, ElementRef, EventInfo, EventRc,
            FieldInfo, FieldRc, MemberInfo, MethodInfo, MethodRc, ParameterInfo, ParameterRc,
            PropertyInfo, PropertyRc, TypeHandle, TypeInfo, TypeRc,
        },
        token::Token,
    },
    projection::Projection,
};

/// Host element kinds a [`Projected`] wrapper can hold
pub trait ProjectedElement: Send + Sync {
    /// Borrow as an [`ElementRef`]
    fn element(&self) -> ElementRef<'_>;
}

impl ProjectedElement for dyn TypeInfo {
    fn element(&self) -> ElementRef<'_> {
        ElementRef::Type(self)
    }
}

impl ProjectedElement for dyn MethodInfo {
    fn element(&self) -> ElementRef<'_> {
        ElementRef::Method(self)
    }
}

impl ProjectedElement for dyn FieldInfo {
    fn element(&self) -> ElementRef<'_> {
        ElementRef::Field(self)
    }
}

impl ProjectedElement for dyn PropertyInfo {
    fn element(&self) -> ElementRef<'_> {
        ElementRef::Property(self)
    }
}

impl ProjectedElement for dyn EventInfo {
    fn element(&self) -> ElementRef<'_> {
        ElementRef::Event(self)
    }
}

impl ProjectedElement for dyn ParameterInfo {
    fn element(&self) -> ElementRef<'_> {
        ElementRef::Parameter(self)
    }
}

impl ProjectedElement for dyn AssemblyInfo {
    fn element(&self) -> ElementRef<'_> {
        ElementRef::Assembly(self)
    }
}

/// A host element seen through a [`Projection`]
pub struct Projected<T: ?Sized, P: Projection> {
    inner: Arc<T>,
    projection: P,
    state: P::State,
}

impl<T: ?Sized, P: Projection> Projected<T, P> {
    /// Wrap `inner` with fresh per-wrapper state
    ///
    /// ## Arguments
    /// * 'inner'      - The host element
    /// * 'projection' - The strategy answering attribute queries
    pub fn new(inner: Arc<T>, projection: P) -> Self {
        Projected {
            inner,
            projection,
            state: P::State::default(),
        }
    }

    /// The wrapped host element
    #[must_use]
    pub fn inner(&self) -> &Arc<T> {
        &self.inner
    }

    /// The projection this wrapper was created by
    #[must_use]
    pub fn projection(&self) -> &P {
        &self.projection
    }

    /// The per-wrapper state
    #[must_use]
    pub fn state(&self) -> &P::State {
        &self.state
    }

    fn wrap_types(&self, types: Vec<TypeRc>) -> Vec<TypeRc> {
        types
            .into_iter()
            .map(|ty| self.projection.wrap_type(ty))
            .collect()
    }
}

impl<T, P> fmt::Debug for Projected<T, P>
where
    T: ?Sized + ProjectedElement,
    P: Projection + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projected")
            .field("kind", &self.inner.element().kind())
            .field("projection", &self.projection)
            .finish_non_exhaustive()
    }
}

impl<T, P> AttributeProvider for Projected<T, P>
where
    T: ?Sized + ProjectedElement,
    P: Projection,
{
    fn custom_attributes(&self, inherit: bool) -> Vec<CustomAttributeRc> {
        self.projection
            .resolve_attributes(&self.state, self.inner.element(), None, inherit)
    }

    fn custom_attributes_of(&self, kind: &AttributeKind, inherit: bool) -> Vec<CustomAttributeRc> {
        self.projection
            .resolve_attributes(&self.state, self.inner.element(), Some(kind), inherit)
    }
}

impl<T, P> MemberInfo for Projected<T, P>
where
    T: ?Sized + ProjectedElement + MemberInfo,
    P: Projection,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn token(&self) -> Token {
        self.inner.token()
    }

    fn element_kind(&self) -> ElementKind {
        self.inner.element_kind()
    }

    fn declaring_type(&self) -> Option<TypeRc> {
        self.inner
            .declaring_type()
            .map(|ty| self.projection.wrap_type(ty))
    }
}

impl<P: Projection> TypeInfo for Projected<dyn TypeInfo, P> {
    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    fn handle(&self) -> TypeHandle {
        self.inner.handle()
    }

    fn assembly(&self) -> Option<AssemblyRc> {
        self.inner
            .assembly()
            .map(|assembly| self.projection.wrap_assembly(assembly))
    }

    fn base_type(&self) -> Option<TypeRc> {
        self.inner
            .base_type()
            .map(|ty| self.projection.wrap_type(ty))
    }

    fn interfaces(&self) -> Vec<TypeRc> {
        self.wrap_types(self.inner.interfaces())
    }

    fn is_interface(&self) -> bool {
        self.inner.is_interface()
    }

    fn is_value_type(&self) -> bool {
        self.inner.is_value_type()
    }

    fn is_abstract(&self) -> bool {
        self.inner.is_abstract()
    }

    fn is_sealed(&self) -> bool {
        self.inner.is_sealed()
    }

    fn is_generic_type_definition(&self) -> bool {
        self.inner.is_generic_type_definition()
    }

    fn generic_arguments(&self) -> Vec<TypeRc> {
        self.wrap_types(self.inner.generic_arguments())
    }

    fn generic_type_definition(&self) -> Option<TypeRc> {
        self.inner
            .generic_type_definition()
            .map(|ty| self.projection.wrap_type(ty))
    }

    fn element_type(&self) -> Option<TypeRc> {
        self.inner
            .element_type()
            .map(|ty| self.projection.wrap_type(ty))
    }

    fn fields(&self) -> Vec<FieldRc> {
        self.inner
            .fields()
            .into_iter()
            .map(|field| self.projection.wrap_field(field))
            .collect()
    }

    fn methods(&self) -> Vec<MethodRc> {
        self.inner
            .methods()
            .into_iter()
            .map(|method| self.projection.wrap_method(method))
            .collect()
    }

    fn constructors(&self) -> Vec<MethodRc> {
        self.inner
            .constructors()
            .into_iter()
            .map(|method| self.projection.wrap_method(method))
            .collect()
    }

    fn properties(&self) -> Vec<PropertyRc> {
        self.inner
            .properties()
            .into_iter()
            .map(|property| self.projection.wrap_property(property))
            .collect()
    }

    fn events(&self) -> Vec<EventRc> {
        self.inner
            .events()
            .into_iter()
            .map(|event| self.projection.wrap_event(event))
            .collect()
    }

    fn nested_types(&self) -> Vec<TypeRc> {
        self.wrap_types(self.inner.nested_types())
    }

    fn underlying(&self) -> Option<TypeRc> {
        Some(self.inner.clone())
    }

    fn full_name(&self) -> String {
        self.inner.full_name()
    }

    fn is_constructed_generic_type(&self) -> bool {
        self.inner.is_constructed_generic_type()
    }
}

impl<P: Projection> MethodInfo for Projected<dyn MethodInfo, P> {
    fn parameters(&self) -> Vec<ParameterRc> {
        self.inner
            .parameters()
            .into_iter()
            .map(|param| self.projection.wrap_parameter(param))
            .collect()
    }

    fn return_parameter(&self) -> ParameterRc {
        self.projection.wrap_parameter(self.inner.return_parameter())
    }

    fn return_type(&self) -> Option<TypeRc> {
        self.inner
            .return_type()
            .map(|ty| self.projection.wrap_type(ty))
    }

    fn is_virtual(&self) -> bool {
        self.inner.is_virtual()
    }

    fn is_abstract(&self) -> bool {
        self.inner.is_abstract()
    }

    fn is_static(&self) -> bool {
        self.inner.is_static()
    }

    fn is_generic_method_definition(&self) -> bool {
        self.inner.is_generic_method_definition()
    }

    fn generic_arguments(&self) -> Vec<TypeRc> {
        self.wrap_types(self.inner.generic_arguments())
    }

    fn generic_method_definition(&self) -> Option<MethodRc> {
        self.inner
            .generic_method_definition()
            .map(|method| self.projection.wrap_method(method))
    }

    fn overridden_method(&self) -> Option<MethodRc> {
        self.inner
            .overridden_method()
            .map(|method| self.projection.wrap_method(method))
    }

    fn underlying(&self) -> Option<MethodRc> {
        Some(self.inner.clone())
    }

    fn is_constructor(&self) -> bool {
        self.inner.is_constructor()
    }

    fn signature(&self) -> String {
        self.inner.signature()
    }
}

impl<P: Projection> FieldInfo for Projected<dyn FieldInfo, P> {
    fn field_type(&self) -> TypeRc {
        self.projection.wrap_type(self.inner.field_type())
    }

    fn is_static(&self) -> bool {
        self.inner.is_static()
    }

    fn underlying(&self) -> Option<FieldRc> {
        Some(self.inner.clone())
    }
}

impl<P: Projection> PropertyInfo for Projected<dyn PropertyInfo, P> {
    fn property_type(&self) -> TypeRc {
        self.projection.wrap_type(self.inner.property_type())
    }

    fn getter(&self) -> Option<MethodRc> {
        self.inner
            .getter()
            .map(|method| self.projection.wrap_method(method))
    }

    fn setter(&self) -> Option<MethodRc> {
        self.inner
            .setter()
            .map(|method| self.projection.wrap_method(method))
    }

    fn overridden_property(&self) -> Option<PropertyRc> {
        self.inner
            .overridden_property()
            .map(|property| self.projection.wrap_property(property))
    }

    fn underlying(&self) -> Option<PropertyRc> {
        Some(self.inner.clone())
    }
}

impl<P: Projection> EventInfo for Projected<dyn EventInfo, P> {
    fn handler_type(&self) -> Option<TypeRc> {
        self.inner
            .handler_type()
            .map(|ty| self.projection.wrap_type(ty))
    }

    fn add_method(&self) -> Option<MethodRc> {
        self.inner
            .add_method()
            .map(|method| self.projection.wrap_method(method))
    }

    fn remove_method(&self) -> Option<MethodRc> {
        self.inner
            .remove_method()
            .map(|method| self.projection.wrap_method(method))
    }

    fn overridden_event(&self) -> Option<EventRc> {
        self.inner
            .overridden_event()
            .map(|event| self.projection.wrap_event(event))
    }

    fn underlying(&self) -> Option<EventRc> {
        Some(self.inner.clone())
    }
}

impl<P: Projection> ParameterInfo for Projected<dyn ParameterInfo, P> {
    fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    fn position(&self) -> i32 {
        self.inner.position()
    }

    fn parameter_type(&self) -> Option<TypeRc> {
        self.inner
            .parameter_type()
            .map(|ty| self.projection.wrap_type(ty))
    }

    fn member(&self) -> Option<MethodRc> {
        self.inner
            .member()
            .map(|method| self.projection.wrap_method(method))
    }

    fn underlying(&self) -> Option<ParameterRc> {
        Some(self.inner.clone())
    }
}

impl<P: Projection> AssemblyInfo for Projected<dyn AssemblyInfo, P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn module_id(&self) -> u64 {
        self.inner.module_id()
    }

    fn types(&self) -> Vec<TypeRc> {
        self.inner
            .types()
            .into_iter()
            .map(|ty| self.projection.wrap_type(ty))
            .collect()
    }

    fn underlying(&self) -> Option<AssemblyRc> {
        Some(self.inner.clone())
    }

    fn get_type(&self, full_name: &str) -> Option<TypeRc> {
        self.inner
            .get_type(full_name)
            .map(|ty| self.projection.wrap_type(ty))
    }
}
