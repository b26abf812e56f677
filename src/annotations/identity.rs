//! Keys identifying annotated elements.
//!
//! Annotations are stored per declaring type, keyed by:
//!
//! - [`TypeIdentity`] - The declaring type, normalized by a [`TypeComparer`]
//! - [`SimpleMemberKey`] - Fields, properties and events: kind plus name
//! - [`MethodKey`] - Methods and constructors: name plus parameter types
//!
//! Keys are derived from the element alone, so the same declared element always produces the
//! same key, however often it is looked up through the host.

use std::fmt;

use crate::metadata::introspection::{ElementKind, MemberInfo, MethodInfo, TypeHandle};

/// Key of a field, property or event within its declaring type
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SimpleMemberKey {
    /// The kind of member
    pub kind: ElementKind,
    /// The member name, compared exactly
    pub name: String,
}

impl SimpleMemberKey {
    /// Create a new key
    ///
    /// ## Arguments
    /// * 'kind' - Field, property or event
    /// * 'name' - The member name
    pub fn new(kind: ElementKind, name: impl Into<String>) -> Self {
        SimpleMemberKey {
            kind,
            name: name.into(),
        }
    }

    /// Key of a declared member
    #[must_use]
    pub fn of<M: MemberInfo + ?Sized>(member: &M) -> Self {
        SimpleMemberKey::new(member.element_kind(), member.name())
    }
}

impl fmt::Display for SimpleMemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Key of one method or constructor overload within its declaring type.
///
/// Parameter types of ordinary methods are kept exact. For generic methods the parameter
/// types are normalized with [`TypeHandle::positional`], so the method's own type parameters
/// act as positional placeholders and instantiations share the key of their definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodKey {
    /// The method name, `.ctor` for constructors
    pub name: String,
    /// Parameter type identities, in declaration order
    pub parameters: Vec<TypeHandle>,
}

impl MethodKey {
    /// Create a new key from already normalized parameter handles
    ///
    /// ## Arguments
    /// * 'name'       - The method name
    /// * 'parameters' - The parameter type identities
    pub fn new(name: impl Into<String>, parameters: Vec<TypeHandle>) -> Self {
        MethodKey {
            name: name.into(),
            parameters,
        }
    }

    /// Key of a declared method, constructor, or instantiated generic method
    #[must_use]
    pub fn of(method: &dyn MethodInfo) -> Self {
        let definition = method.generic_method_definition();
        let source: &dyn MethodInfo = match definition.as_deref() {
            Some(definition) => definition,
            None => method,
        };
        let generic = source.is_generic_method_definition();

        let parameters = source
            .parameters()
            .iter()
            .filter_map(|param| param.parameter_type())
            .map(|ty| {
                let handle = ty.handle();
                if generic {
                    handle.positional()
                } else {
                    handle
                }
            })
            .collect();

        MethodKey::new(source.name(), parameters)
    }

    /// Returns `true` if `handles` select this overload
    ///
    /// Exact handles always match; for a generic method, handles equal after positional
    /// normalization match as well.
    ///
    /// ## Arguments
    /// * 'handles' - Requested parameter type identities
    #[must_use]
    pub fn matches(&self, handles: &[TypeHandle]) -> bool {
        self.parameters.len() == handles.len()
            && self
                .parameters
                .iter()
                .zip(handles)
                .all(|(own, requested)| own == requested || *own == requested.positional())
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} parameters)", self.name, self.parameters.len())
    }
}

/// A declaring type as seen by a [`TypeComparer`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeIdentity(TypeHandle);

impl TypeIdentity {
    /// Identity that is the handle itself, without normalization
    #[must_use]
    pub fn exact(handle: TypeHandle) -> Self {
        TypeIdentity(handle)
    }

    /// The identity's handle
    #[must_use]
    pub fn handle(&self) -> &TypeHandle {
        &self.0
    }
}

/// Strategy deciding which types share annotations.
///
/// The builder and the table it produces use the same comparer. The projection cache does not
/// use one at all: it keys by exact handles.
pub trait TypeComparer: Send + Sync + fmt::Debug {
    /// The identity `handle` is stored and looked up under
    fn identity(&self, handle: &TypeHandle) -> TypeIdentity;
}

/// Treats every instantiation of a generic type as its generic definition
///
/// Annotations added to `Container<T>` apply to `Container<int>`, `Container<string>`, and
/// every other instantiation. This is the default.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenGenericComparer;

impl TypeComparer for OpenGenericComparer {
    fn identity(&self, handle: &TypeHandle) -> TypeIdentity {
        TypeIdentity(handle.open_definition())
    }
}

/// Keys every type by its exact handle
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactComparer;

impl TypeComparer for ExactComparer {
    fn identity(&self, handle: &TypeHandle) -> TypeIdentity {
        TypeIdentity(handle.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::typesystem::{
        CilPrimitiveKind, FieldBuilder, MethodBuilder, ParamType, TypeBuilder, TypeRegistry,
    };

    #[test]
    fn test_simple_member_key() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let host = TypeBuilder::class("Tests", "Host").build(&registry).unwrap();
        let field = FieldBuilder::new("count", &int32).build(&host).unwrap();

        let key = SimpleMemberKey::of(field.as_ref());
        assert_eq!(key, SimpleMemberKey::new(ElementKind::Field, "count"));
        assert_ne!(key, SimpleMemberKey::new(ElementKind::Property, "count"));
        assert_ne!(key, SimpleMemberKey::new(ElementKind::Field, "Count"));
        assert_eq!(key.to_string(), "field count");
    }

    #[test]
    fn test_method_keys_distinguish_overloads() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let int64 = registry.get_primitive(CilPrimitiveKind::I8).unwrap();
        let host = TypeBuilder::class("Tests", "Host").build(&registry).unwrap();

        let narrow = MethodBuilder::new("Put")
            .parameter("value", &int32)
            .build(&host)
            .unwrap();
        let wide = MethodBuilder::new("Put")
            .parameter("value", &int64)
            .build(&host)
            .unwrap();

        assert_ne!(MethodKey::of(narrow.as_ref()), MethodKey::of(wide.as_ref()));
        assert_eq!(MethodKey::of(narrow.as_ref()), MethodKey::of(narrow.as_ref()));
        assert!(MethodKey::of(narrow.as_ref()).matches(&[int32.handle.clone()]));
        assert!(!MethodKey::of(narrow.as_ref()).matches(&[int64.handle.clone()]));
    }

    #[test]
    fn test_generic_method_keys_are_positional() {
        let registry = TypeRegistry::new("Tests");
        let string = registry.get_primitive(CilPrimitiveKind::String).unwrap();
        let host = TypeBuilder::class("Tests", "Host").build(&registry).unwrap();
        let first = TypeBuilder::class("Tests", "Other").build(&registry).unwrap();

        let echo = MethodBuilder::new("Echo")
            .generic_params(&["T"])
            .parameter("value", ParamType::MethodGeneric(0))
            .build(&host)
            .unwrap();
        let twin = MethodBuilder::new("Echo")
            .generic_params(&["U"])
            .parameter("value", ParamType::MethodGeneric(0))
            .build(&first)
            .unwrap();
        let echo_string = echo.make_generic(&[string]).unwrap();

        assert_eq!(MethodKey::of(echo.as_ref()), MethodKey::of(twin.as_ref()));
        assert_eq!(MethodKey::of(echo.as_ref()), MethodKey::of(echo_string.as_ref()));
        assert!(MethodKey::of(echo.as_ref()).matches(&twin.parameter_handles()));
    }

    #[test]
    fn test_comparers() {
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let list = TypeBuilder::class("Tests", "List`1")
            .generic_params(&["T"])
            .build(&registry)
            .unwrap();
        let of_int = registry.make_generic_instance(&list, &[int32]).unwrap();

        assert_eq!(
            OpenGenericComparer.identity(&of_int.handle),
            OpenGenericComparer.identity(&list.handle)
        );
        assert_ne!(
            ExactComparer.identity(&of_int.handle),
            ExactComparer.identity(&list.handle)
        );
        assert_eq!(ExactComparer.identity(&list.handle).handle(), &list.handle);
    }
}
