//! Staging of external attributes before a table is frozen.

use std::{collections::HashMap, fmt, sync::Arc};

use log::debug;

use crate::{
    annotations::{
        identity::{MethodKey, OpenGenericComparer, SimpleMemberKey, TypeComparer, TypeIdentity},
        metadata::{MethodAnnotations, TypeAnnotations},
        selector::{Selection, Selector},
        table::AnnotationTable,
    },
    metadata::{
        customattributes::CustomAttributeRc,
        introspection::{
            AssemblyInfo, ElementKind, MemberInfo, MemberRef, MethodInfo, MethodRc, ParameterInfo,
            TypeHandle, TypeInfo,
        },
    },
    Error, Result,
};

/// Mutable staging area for externally attached attributes.
///
/// Every `add_*` operation validates its target first and either applies completely or fails
/// leaving the builder unchanged. Adding an empty attribute sequence is legal and changes
/// nothing. Attributes accumulate: adding twice to the same element appends.
///
/// [`AnnotationTableBuilder::create_table`] snapshots the current state into an immutable
/// [`AnnotationTable`]. The builder stays usable afterwards, and later additions never reach
/// tables created earlier.
///
/// The builder is meant for a single writer during setup; the tables it produces are
/// `Send + Sync`.
///
/// # Examples
///
/// ```rust
/// use attrscope::annotations::AnnotationTableBuilder;
/// use attrscope::metadata::customattributes::{AttributeKind, CustomAttribute};
/// use attrscope::metadata::typesystem::{
///     CilPrimitiveKind, MethodBuilder, PropertyBuilder, TypeBuilder, TypeRegistry,
/// };
///
/// let registry = TypeRegistry::new("Sample");
/// let string = registry.get_primitive(CilPrimitiveKind::String)?;
/// let customer = TypeBuilder::class("Sample", "Customer").build(&registry)?;
/// PropertyBuilder::new("Email", &string).setter().build(&customer)?;
/// MethodBuilder::new("Rename").parameter("name", &string).build(&customer)?;
///
/// let required = AttributeKind::new("Sample", "RequiredAttribute").into_rc();
///
/// let mut builder = AnnotationTableBuilder::new();
/// builder
///     .add_property_attributes(customer.as_ref(), "Email", [CustomAttribute::new(&required).into_rc()])?
///     .add_selected_attributes(customer.as_ref(), "Rename(String)[0]", [CustomAttribute::new(&required).into_rc()])?;
///
/// let table = builder.create_table();
/// assert_eq!(table.len(), 1);
/// # Ok::<(), attrscope::Error>(())
/// ```
#[derive(Clone)]
pub struct AnnotationTableBuilder {
    comparer: Arc<dyn TypeComparer>,
    types: Arc<HashMap<TypeIdentity, TypeAnnotations>>,
}

impl AnnotationTableBuilder {
    /// Create an empty builder that shares annotations across generic instantiations
    #[must_use]
    pub fn new() -> Self {
        AnnotationTableBuilder::with_comparer(Arc::new(OpenGenericComparer))
    }

    /// Create an empty builder using `comparer` to identify declaring types
    ///
    /// ## Arguments
    /// * 'comparer' - The type identity strategy, inherited by every table this builder creates
    #[must_use]
    pub fn with_comparer(comparer: Arc<dyn TypeComparer>) -> Self {
        AnnotationTableBuilder {
            comparer,
            types: Arc::new(HashMap::new()),
        }
    }

    /// Number of types with staged annotations
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if nothing has been staged
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Freeze the current state into an immutable table
    ///
    /// Can be called any number of times; each table reflects the additions made before it.
    #[must_use]
    pub fn create_table(&self) -> AnnotationTable {
        debug!("Freezing annotation table with {} annotated types", self.types.len());
        AnnotationTable::new(self.types.clone(), self.comparer.clone())
    }

    /// Compute the new annotations of one type and store them
    ///
    /// `change` runs before anything is written, so an error leaves the builder unchanged.
    fn update<F>(&mut self, handle: &TypeHandle, change: F) -> Result<()>
    where
        F: FnOnce(&TypeAnnotations) -> Result<TypeAnnotations>,
    {
        let identity = self.comparer.identity(handle);
        let current = self
            .types
            .get(&identity)
            .unwrap_or(TypeAnnotations::empty());
        let updated = change(current)?;

        Arc::make_mut(&mut self.types).insert(identity, updated);
        Ok(())
    }

    /// Attach attributes to a type
    ///
    /// With the default comparer, attributes added to a generic type definition or to any of
    /// its instantiations apply to all of them.
    ///
    /// ## Arguments
    /// * 'ty'         - The type to annotate
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// None for well-formed types; the signature matches the other `add_*` operations.
    pub fn add_type_attributes(
        &mut self,
        ty: &dyn TypeInfo,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        let attributes: Vec<CustomAttributeRc> = attributes.into_iter().collect();
        if attributes.is_empty() {
            return Ok(self);
        }

        self.update(&ty.handle(), |current| {
            Ok(current.with_type_attributes(&attributes))
        })?;
        debug!(
            "Staged {} attribute(s) on type {}",
            attributes.len(),
            ty.full_name()
        );
        Ok(self)
    }

    /// Attach attributes to a type looked up by full name in an assembly
    ///
    /// ## Arguments
    /// * 'assembly'   - The assembly defining the type
    /// * 'full_name'  - Namespace-qualified type name
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for an empty name and [`Error::MemberNotFound`] when
    /// the assembly defines no such type.
    pub fn add_type_attributes_by_name(
        &mut self,
        assembly: &dyn AssemblyInfo,
        full_name: &str,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        if full_name.is_empty() {
            return Err(invalid_argument!("full_name", "type name must not be empty"));
        }

        let ty = assembly
            .get_type(full_name)
            .ok_or_else(|| Error::MemberNotFound {
                type_name: assembly.name().to_string(),
                member: full_name.to_string(),
                kind: ElementKind::Type,
            })?;

        self.add_type_attributes(ty.as_ref(), attributes)
    }

    /// Attach attributes to any member, dispatching on its kind
    ///
    /// Types go to [`AnnotationTableBuilder::add_type_attributes`], methods and constructors to
    /// [`AnnotationTableBuilder::add_method_attributes`], and fields, properties and events are
    /// keyed by kind and name within their declaring type.
    ///
    /// ## Arguments
    /// * 'member'     - The member to annotate
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the member has no declaring type.
    pub fn add_member_attributes(
        &mut self,
        member: &MemberRef,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        match member {
            MemberRef::Type(ty) => self.add_type_attributes(ty.as_ref(), attributes),
            MemberRef::Method(method) => self.add_method_attributes(method.as_ref(), attributes),
            MemberRef::Field(field) => self.add_simple(field.as_ref(), attributes),
            MemberRef::Property(property) => self.add_simple(property.as_ref(), attributes),
            MemberRef::Event(event) => self.add_simple(event.as_ref(), attributes),
        }
    }

    fn add_simple<M: MemberInfo + ?Sized>(
        &mut self,
        member: &M,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        let declaring = member.declaring_type().ok_or_else(|| {
            invalid_argument!(
                "member",
                "{} '{}' has no declaring type",
                member.element_kind(),
                member.name()
            )
        })?;

        let key = SimpleMemberKey::of(member);
        let attributes: Vec<CustomAttributeRc> = attributes.into_iter().collect();
        if attributes.is_empty() {
            return Ok(self);
        }

        let target = format!("{} {}.{}", key.kind, declaring.full_name(), key.name);
        self.update(&declaring.handle(), |current| {
            Ok(current.with_member_attributes(key, &attributes))
        })?;
        debug!("Staged {} attribute(s) on {}", attributes.len(), target);
        Ok(self)
    }

    /// Declared-only lookup of a single field, property or event by name
    fn find_simple(
        ty: &dyn TypeInfo,
        kind: ElementKind,
        name: &str,
        candidates: Vec<MemberRef>,
    ) -> Result<MemberRef> {
        if name.is_empty() {
            return Err(invalid_argument!("name", "member name must not be empty"));
        }

        let mut matches: Vec<MemberRef> = candidates
            .into_iter()
            .filter(|member| member.name() == name)
            .collect();

        match matches.len() {
            0 => Err(Error::MemberNotFound {
                type_name: ty.full_name(),
                member: name.to_string(),
                kind,
            }),
            1 => Ok(matches.remove(0)),
            count => Err(Error::AmbiguousMember {
                type_name: ty.full_name(),
                member: name.to_string(),
                kind,
                count,
            }),
        }
    }

    /// Attach attributes to a property declared by `ty`
    ///
    /// ## Arguments
    /// * 'ty'         - The declaring type; inherited properties are not considered
    /// * 'name'       - The property name, compared exactly
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for an empty name, [`Error::MemberNotFound`] or
    /// [`Error::AmbiguousMember`] when the name does not identify exactly one declared property.
    pub fn add_property_attributes(
        &mut self,
        ty: &dyn TypeInfo,
        name: &str,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        let candidates = ty.properties().into_iter().map(MemberRef::Property).collect();
        let member = Self::find_simple(ty, ElementKind::Property, name, candidates)?;
        self.add_member_attributes(&member, attributes)
    }

    /// Attach attributes to a field declared by `ty`
    ///
    /// ## Arguments
    /// * 'ty'         - The declaring type; inherited fields are not considered
    /// * 'name'       - The field name, compared exactly
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// Same as [`AnnotationTableBuilder::add_property_attributes`].
    pub fn add_field_attributes(
        &mut self,
        ty: &dyn TypeInfo,
        name: &str,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        let candidates = ty.fields().into_iter().map(MemberRef::Field).collect();
        let member = Self::find_simple(ty, ElementKind::Field, name, candidates)?;
        self.add_member_attributes(&member, attributes)
    }

    /// Attach attributes to an event declared by `ty`
    ///
    /// ## Arguments
    /// * 'ty'         - The declaring type; inherited events are not considered
    /// * 'name'       - The event name, compared exactly
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// Same as [`AnnotationTableBuilder::add_property_attributes`].
    pub fn add_event_attributes(
        &mut self,
        ty: &dyn TypeInfo,
        name: &str,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        let candidates = ty.events().into_iter().map(MemberRef::Event).collect();
        let member = Self::find_simple(ty, ElementKind::Event, name, candidates)?;
        self.add_member_attributes(&member, attributes)
    }

    /// Stage a change to the annotations of one method overload
    ///
    /// `change` returns `None` when `position` is outside the overload's parameter slots.
    fn update_method<F>(
        &mut self,
        method: &dyn MethodInfo,
        target: &str,
        position: i32,
        count: usize,
        change: F,
    ) -> Result<&mut Self>
    where
        F: FnOnce(&MethodAnnotations) -> Option<MethodAnnotations>,
    {
        let declaring = method.declaring_type().ok_or_else(|| {
            invalid_argument!("method", "'{}' has no declaring type", method.signature())
        })?;
        if count == 0 {
            return Ok(self);
        }

        let key = MethodKey::of(method);
        let parameter_count = method.parameters().len();
        self.update(&declaring.handle(), |current| {
            current
                .with_method(key, parameter_count, change)
                .ok_or_else(|| Error::ParameterNotFound {
                    method: method.signature(),
                    position,
                })
        })?;

        debug!(
            "Staged {} attribute(s) on {} of {}.{}",
            count,
            target,
            declaring.full_name(),
            method.signature()
        );
        Ok(self)
    }

    /// Attach attributes to a method or constructor
    ///
    /// Overloads are told apart by their parameter types. Instantiations of a generic method
    /// share the annotations of their generic definition.
    ///
    /// ## Arguments
    /// * 'method'     - The method to annotate
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the method has no declaring type.
    pub fn add_method_attributes(
        &mut self,
        method: &dyn MethodInfo,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        let attributes: Vec<CustomAttributeRc> = attributes.into_iter().collect();
        self.update_method(method, "method", -1, attributes.len(), |current| {
            Some(current.with_method_attributes(&attributes))
        })
    }

    /// Declared-only overload lookup by parameter types
    fn find_overload(
        ty: &dyn TypeInfo,
        name: &str,
        kind: ElementKind,
        candidates: Vec<MethodRc>,
        parameter_types: &[TypeHandle],
    ) -> Result<MethodRc> {
        let mut matches: Vec<MethodRc> = candidates
            .into_iter()
            .filter(|method| MethodKey::of(method.as_ref()).matches(parameter_types))
            .collect();

        let member = format!("{}({} parameters)", name, parameter_types.len());
        match matches.len() {
            0 => Err(Error::MemberNotFound {
                type_name: ty.full_name(),
                member,
                kind,
            }),
            1 => Ok(matches.remove(0)),
            count => Err(Error::AmbiguousMember {
                type_name: ty.full_name(),
                member,
                kind,
                count,
            }),
        }
    }

    /// Attach attributes to a method overload declared by `ty`, selected by parameter types
    ///
    /// ## Arguments
    /// * 'ty'              - The declaring type; inherited methods are not considered
    /// * 'name'            - The method name
    /// * 'parameter_types' - Exact handles of the parameter types, in order
    /// * 'attributes'      - The attributes to attach, in order
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for an empty name, [`Error::MemberNotFound`] or
    /// [`Error::AmbiguousMember`] when the signature does not select exactly one overload.
    pub fn add_method_attributes_by_signature(
        &mut self,
        ty: &dyn TypeInfo,
        name: &str,
        parameter_types: &[TypeHandle],
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        if name.is_empty() {
            return Err(invalid_argument!("name", "method name must not be empty"));
        }

        let method = Self::find_overload(
            ty,
            name,
            ElementKind::Method,
            ty.methods_named(name),
            parameter_types,
        )?;
        self.add_method_attributes(method.as_ref(), attributes)
    }

    /// Attach attributes to a constructor overload declared by `ty`
    ///
    /// ## Arguments
    /// * 'ty'              - The declaring type
    /// * 'parameter_types' - Exact handles of the parameter types, in order
    /// * 'attributes'      - The attributes to attach, in order
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] or [`Error::AmbiguousMember`] when the signature does
    /// not select exactly one constructor.
    pub fn add_constructor_attributes(
        &mut self,
        ty: &dyn TypeInfo,
        parameter_types: &[TypeHandle],
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        let constructor = Self::find_overload(
            ty,
            ".ctor",
            ElementKind::Constructor,
            ty.constructors(),
            parameter_types,
        )?;
        self.add_method_attributes(constructor.as_ref(), attributes)
    }

    /// Attach attributes to the return value of a method
    ///
    /// ## Arguments
    /// * 'method'     - The method whose return value is annotated
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the method has no declaring type.
    pub fn add_return_value_attributes(
        &mut self,
        method: &dyn MethodInfo,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        let attributes: Vec<CustomAttributeRc> = attributes.into_iter().collect();
        self.update_method(method, "return value", -1, attributes.len(), |current| {
            Some(current.with_return_value_attributes(&attributes))
        })
    }

    /// Attach attributes to the parameter at `position` of `method`
    ///
    /// ## Arguments
    /// * 'method'     - The declaring method
    /// * 'position'   - Zero-based parameter position
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// Returns [`Error::ParameterNotFound`] when `position` is not below the method's
    /// parameter count.
    pub fn add_parameter_attributes_at(
        &mut self,
        method: &dyn MethodInfo,
        position: usize,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        let slot = i32::try_from(position).unwrap_or(i32::MAX);
        if position >= method.parameters().len() {
            return Err(Error::ParameterNotFound {
                method: method.signature(),
                position: slot,
            });
        }

        let attributes: Vec<CustomAttributeRc> = attributes.into_iter().collect();
        self.update_method(method, "parameter", slot, attributes.len(), |current| {
            current.with_parameter_attributes(position, &attributes)
        })
    }

    /// Attach attributes to a parameter
    ///
    /// Position -1 denotes the return value and is routed to
    /// [`AnnotationTableBuilder::add_return_value_attributes`].
    ///
    /// ## Arguments
    /// * 'parameter'  - The parameter to annotate
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// Returns [`Error::ParameterNotFound`] when the parameter's method is gone or the position
    /// lies outside the method's parameter list.
    pub fn add_parameter_attributes(
        &mut self,
        parameter: &dyn ParameterInfo,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        let position = parameter.position();
        let method = parameter.member().ok_or_else(|| Error::ParameterNotFound {
            method: parameter.name().unwrap_or("<return>").to_string(),
            position,
        })?;

        match position {
            -1 => self.add_return_value_attributes(method.as_ref(), attributes),
            _ => match usize::try_from(position) {
                Ok(position) => self.add_parameter_attributes_at(method.as_ref(), position, attributes),
                Err(_) => Err(Error::ParameterNotFound {
                    method: method.signature(),
                    position,
                }),
            },
        }
    }

    /// Attach attributes to the element a textual selector names within `ty`
    ///
    /// See [`crate::annotations::selector`] for the selector syntax.
    ///
    /// ## Arguments
    /// * 'ty'         - The declaring type
    /// * 'selector'   - The selector text
    /// * 'attributes' - The attributes to attach, in order
    ///
    /// # Errors
    /// Returns [`Error::Resolution`] if the selector is malformed or does not resolve to
    /// exactly one element.
    pub fn add_selected_attributes(
        &mut self,
        ty: &dyn TypeInfo,
        selector: &str,
        attributes: impl IntoIterator<Item = CustomAttributeRc>,
    ) -> Result<&mut Self> {
        match Selector::parse(selector)?.resolve(ty)? {
            Selection::Member(member) => self.add_member_attributes(&member, attributes),
            Selection::ReturnValue(method) => {
                self.add_return_value_attributes(method.as_ref(), attributes)
            }
            Selection::Parameter(method, position) => {
                self.add_parameter_attributes_at(method.as_ref(), position, attributes)
            }
        }
    }
}

impl Default for AnnotationTableBuilder {
    fn default() -> Self {
        AnnotationTableBuilder::new()
    }
}

impl fmt::Debug for AnnotationTableBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationTableBuilder")
            .field("types", &self.types.len())
            .field("comparer", &self.comparer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annotations::identity::ExactComparer,
        metadata::{
            customattributes::{AttributeKind, CustomAttribute},
            introspection::ElementRef,
            typesystem::{
                CilPrimitiveKind, EventBuilder, FieldBuilder, MethodBuilder, ParamType,
                PropertyBuilder, TypeBuilder, TypeRegistry,
            },
        },
    };

    fn attr(name: &str) -> CustomAttributeRc {
        let kind = AttributeKind::new("Test", name).into_rc();
        CustomAttribute::new(&kind).into_rc()
    }

    fn names(attrs: &[CustomAttributeRc]) -> Vec<&str> {
        attrs.iter().map(|a| a.kind.name.as_str()).collect()
    }

    #[test]
    fn test_empty_sequence_is_noop() {
        let registry = TypeRegistry::new("Tests");
        let host = TypeBuilder::class("Tests", "Host").build(&registry).unwrap();

        let mut builder = AnnotationTableBuilder::default();
        builder.add_type_attributes(host.as_ref(), Vec::new()).unwrap();
        assert!(builder.is_empty());
    }

    #[test]
    fn test_lookup_failures_leave_builder_unchanged() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let base = TypeBuilder::class("Tests", "Base").build(&registry).unwrap();
        FieldBuilder::new("inherited", &int32).build(&base).unwrap();
        let host = TypeBuilder::class("Tests", "Host")
            .extends(&base)
            .build(&registry)
            .unwrap();
        MethodBuilder::new("Put").parameter("v", &int32).build(&host).unwrap();

        let mut builder = AnnotationTableBuilder::new();
        builder.add_type_attributes(host.as_ref(), [attr("A")]).unwrap();
        let before = builder.create_table();

        assert!(matches!(
            builder.add_field_attributes(host.as_ref(), "inherited", [attr("B")]),
            Err(Error::MemberNotFound { kind: ElementKind::Field, .. })
        ));
        assert!(matches!(
            builder.add_property_attributes(host.as_ref(), "", [attr("B")]),
            Err(Error::InvalidArgument { parameter: "name", .. })
        ));
        assert!(matches!(
            builder.add_type_attributes_by_name(registry.as_ref(), "", [attr("B")]),
            Err(Error::InvalidArgument { parameter: "full_name", .. })
        ));
        assert!(matches!(
            builder.add_type_attributes_by_name(registry.as_ref(), "Tests.Nope", [attr("B")]),
            Err(Error::MemberNotFound { kind: ElementKind::Type, .. })
        ));
        assert!(matches!(
            builder.add_method_attributes_by_signature(host.as_ref(), "Put", &[], [attr("B")]),
            Err(Error::MemberNotFound { kind: ElementKind::Method, .. })
        ));
        assert!(matches!(
            builder.add_selected_attributes(host.as_ref(), "Put(Int32)[3]", [attr("B")]),
            Err(Error::Resolution { .. })
        ));

        let after = builder.create_table();
        assert_eq!(
            names(after.type_annotations(&host.handle).type_attributes()),
            names(before.type_annotations(&host.handle).type_attributes())
        );
        assert_eq!(after.len(), 1);
    }

    #[test]
    fn test_ambiguous_field_name() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let host = TypeBuilder::class("Tests", "Host").build(&registry).unwrap();
        FieldBuilder::new("dup", &int32).build(&host).unwrap();
        FieldBuilder::new("dup", &int32).static_field().build(&host).unwrap();

        let mut builder = AnnotationTableBuilder::new();
        assert!(matches!(
            builder.add_field_attributes(host.as_ref(), "dup", [attr("A")]),
            Err(Error::AmbiguousMember { count: 2, .. })
        ));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_parameter_routing() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let host = TypeBuilder::class("Tests", "Host").build(&registry).unwrap();
        let method = MethodBuilder::new("Get")
            .parameter("index", &int32)
            .returns(&int32)
            .build(&host)
            .unwrap();

        let mut builder = AnnotationTableBuilder::new();
        builder
            .add_parameter_attributes(method.return_param().as_ref(), [attr("Ret")])
            .unwrap()
            .add_parameter_attributes(method.params()[0].as_ref(), [attr("Arg")])
            .unwrap();
        assert!(matches!(
            builder.add_parameter_attributes_at(method.as_ref(), 1, [attr("X")]),
            Err(Error::ParameterNotFound { position: 1, .. })
        ));

        let table = builder.create_table();
        let annotations = table.method_annotations(method.as_ref()).unwrap();
        assert_eq!(names(annotations.return_value()), ["Ret"]);
        assert_eq!(names(annotations.parameter(0)), ["Arg"]);
        assert!(annotations.method().is_empty());
    }

    #[test]
    fn test_snapshots_are_independent() {
        let registry = TypeRegistry::new("Tests");
        let host = TypeBuilder::class("Tests", "Host").build(&registry).unwrap();

        let mut builder = AnnotationTableBuilder::new();
        builder.add_type_attributes(host.as_ref(), [attr("First")]).unwrap();
        let first = builder.create_table();
        builder.add_type_attributes(host.as_ref(), [attr("Second")]).unwrap();
        let second = builder.create_table();

        assert_eq!(names(first.type_annotations(&host.handle).type_attributes()), ["First"]);
        assert_eq!(
            names(second.type_annotations(&host.handle).type_attributes()),
            ["First", "Second"]
        );
    }

    #[test]
    fn test_member_dispatch_and_by_signature() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let int64 = registry.get_primitive(CilPrimitiveKind::I8).unwrap();
        let delegate = registry.get_primitive(CilPrimitiveKind::Delegate).unwrap();
        let host = TypeBuilder::class("Tests", "Host").build(&registry).unwrap();
        let narrow = MethodBuilder::new("Put").parameter("v", &int32).build(&host).unwrap();
        let wide = MethodBuilder::new("Put").parameter("v", &int64).build(&host).unwrap();
        let ctor = MethodBuilder::constructor().parameter("seed", &int32).build(&host).unwrap();
        let changed = EventBuilder::new("Changed", &delegate).build(&host).unwrap();
        let size = PropertyBuilder::new("Size", &int32).build(&host).unwrap();

        let mut builder = AnnotationTableBuilder::new();
        builder
            .add_method_attributes_by_signature(host.as_ref(), "Put", &[int64.handle.clone()], [attr("Wide")])
            .unwrap()
            .add_constructor_attributes(host.as_ref(), &[int32.handle.clone()], [attr("Ctor")])
            .unwrap()
            .add_event_attributes(host.as_ref(), "Changed", [attr("Event")])
            .unwrap()
            .add_member_attributes(&MemberRef::Property(size.clone()), [attr("Prop")])
            .unwrap();
        let table = builder.create_table();

        assert!(table.attributes_for(ElementRef::Method(narrow.as_ref())).is_empty());
        assert_eq!(names(&table.attributes_for(ElementRef::Method(wide.as_ref()))), ["Wide"]);
        assert_eq!(names(&table.attributes_for(ElementRef::Method(ctor.as_ref()))), ["Ctor"]);
        assert_eq!(names(&table.attributes_for(ElementRef::Event(changed.as_ref()))), ["Event"]);
        assert_eq!(names(&table.attributes_for(ElementRef::Property(size.as_ref()))), ["Prop"]);
    }

    #[test]
    fn test_generic_sharing_depends_on_comparer() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let string = registry.get_primitive(CilPrimitiveKind::String).unwrap();
        let boxed = TypeBuilder::class("Tests", "Box`1")
            .generic_params(&["T"])
            .build(&registry)
            .unwrap();
        let of_int = registry.make_generic_instance(&boxed, &[int32]).unwrap();
        let of_string = registry.make_generic_instance(&boxed, &[string.clone()]).unwrap();

        let mut open = AnnotationTableBuilder::new();
        open.add_type_attributes(of_int.as_ref(), [attr("Shared")]).unwrap();
        let table = open.create_table();
        assert_eq!(names(table.type_annotations(&of_string.handle).type_attributes()), ["Shared"]);
        assert_eq!(names(table.type_annotations(&boxed.handle).type_attributes()), ["Shared"]);

        let mut exact = AnnotationTableBuilder::with_comparer(Arc::new(ExactComparer));
        exact.add_type_attributes(of_int.as_ref(), [attr("Only")]).unwrap();
        let table = exact.create_table();
        assert!(table.type_annotations(&of_string.handle).is_empty());
        assert!(table.type_annotations(&boxed.handle).is_empty());

        let echo = MethodBuilder::new("Echo")
            .generic_params(&["U"])
            .parameter("value", ParamType::MethodGeneric(0))
            .build(&boxed)
            .unwrap();
        let echo_string = echo.make_generic(&[string]).unwrap();
        let mut generic = AnnotationTableBuilder::new();
        generic
            .add_method_attributes(echo_string.as_ref(), [attr("Echo")])
            .unwrap();
        let table = generic.create_table();
        assert_eq!(names(&table.attributes_for(ElementRef::Method(echo.as_ref()))), ["Echo"]);
    }
}
