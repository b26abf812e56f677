//! Exact structural identity of types.

use std::sync::Arc;

use crate::metadata::token::Token;

/// Exact identity of a type, comparable without holding the type itself.
///
/// Two handles are equal only when they denote the same type, including generic arguments.
/// [`TypeHandle::open_definition`] gives the normalized form that treats every instantiation
/// of a generic type as its definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeHandle {
    /// A type definition in an assembly
    Definition {
        /// Name of the defining assembly
        assembly: Arc<str>,
        /// Identifier of the loaded assembly, see [`AssemblyInfo::module_id`]
        ///
        /// [`AssemblyInfo::module_id`]: crate::metadata::introspection::AssemblyInfo::module_id
        module: u64,
        /// Token of the definition within that assembly
        token: Token,
    },
    /// A generic type instantiated with type arguments
    Constructed {
        /// The generic type definition
        definition: Box<TypeHandle>,
        /// The type arguments, in declaration order
        arguments: Vec<TypeHandle>,
    },
    /// A generic parameter of a generic type
    TypeParameter {
        /// The generic type definition declaring the parameter
        owner: Box<TypeHandle>,
        /// Zero-based position in the owner's generic parameter list
        position: u16,
    },
    /// A generic parameter of a generic method
    MethodParameter {
        /// Token of the declaring method, `None` for positional placeholders
        method: Option<Token>,
        /// Zero-based position in the method's generic parameter list
        position: u16,
    },
    /// A single-dimensional, zero-based array
    Array(Box<TypeHandle>),
    /// A managed reference (`ref` / `out` parameter type)
    ByRef(Box<TypeHandle>),
}

impl TypeHandle {
    /// Create a handle for a type definition
    ///
    /// ## Arguments
    /// * 'assembly' - Name of the defining assembly
    /// * 'module'   - Identifier of the loaded assembly
    /// * 'token'    - Token of the type definition
    pub fn definition(assembly: impl Into<Arc<str>>, module: u64, token: Token) -> Self {
        TypeHandle::Definition {
            assembly: assembly.into(),
            module,
            token,
        }
    }

    /// Returns `true` for a generic instantiation
    #[must_use]
    pub fn is_constructed(&self) -> bool {
        matches!(self, TypeHandle::Constructed { .. })
    }

    /// Returns `true` for generic parameters of either types or methods
    #[must_use]
    pub fn is_generic_parameter(&self) -> bool {
        matches!(
            self,
            TypeHandle::TypeParameter { .. } | TypeHandle::MethodParameter { .. }
        )
    }

    /// Strip the generic argument list, leaving the open generic definition
    ///
    /// Non-generic handles are returned unchanged.
    #[must_use]
    pub fn open_definition(&self) -> TypeHandle {
        match self {
            TypeHandle::Constructed { definition, .. } => definition.open_definition(),
            other => other.clone(),
        }
    }

    /// Normalize for comparing parameter types of generic methods
    ///
    /// Generic argument lists are stripped through array and by-ref wrappers, and generic method
    /// parameters lose their owner so they act as positional placeholders: `M<T>(T)` and
    /// `M<U>(U)` produce equal handles.
    #[must_use]
    pub fn positional(&self) -> TypeHandle {
        match self {
            TypeHandle::Constructed { definition, .. } => definition.positional(),
            TypeHandle::MethodParameter { position, .. } => TypeHandle::MethodParameter {
                method: None,
                position: *position,
            },
            TypeHandle::Array(element) => TypeHandle::Array(Box::new(element.positional())),
            TypeHandle::ByRef(element) => TypeHandle::ByRef(Box::new(element.positional())),
            other => other.clone(),
        }
    }

    /// Drop the owning method of every generic method parameter, keeping all type arguments
    ///
    /// Used to compare signatures of methods that each declare their own generic parameters.
    #[must_use]
    pub fn erase_method_owners(&self) -> TypeHandle {
        self.map_leaves(&|handle| match handle {
            TypeHandle::MethodParameter { position, .. } => Some(TypeHandle::MethodParameter {
                method: None,
                position: *position,
            }),
            _ => None,
        })
    }

    /// Replace the generic parameters of `owner` with `arguments`
    ///
    /// ## Arguments
    /// * 'owner'     - The generic type definition whose parameters are bound
    /// * 'arguments' - The type arguments, by position
    #[must_use]
    pub fn bind_type_parameters(&self, owner: &TypeHandle, arguments: &[TypeHandle]) -> TypeHandle {
        self.map_leaves(&|handle| match handle {
            TypeHandle::TypeParameter {
                owner: declared,
                position,
            } if declared.as_ref() == owner => arguments.get(usize::from(*position)).cloned(),
            _ => None,
        })
    }

    fn map_leaves(&self, map: &dyn Fn(&TypeHandle) -> Option<TypeHandle>) -> TypeHandle {
        if let Some(mapped) = map(self) {
            return mapped;
        }

        match self {
            TypeHandle::Constructed {
                definition,
                arguments,
            } => TypeHandle::Constructed {
                definition: definition.clone(),
                arguments: arguments.iter().map(|arg| arg.map_leaves(map)).collect(),
            },
            TypeHandle::Array(element) => TypeHandle::Array(Box::new(element.map_leaves(map))),
            TypeHandle::ByRef(element) => TypeHandle::ByRef(Box::new(element.map_leaves(map))),
            other => other.clone(),
        }
    }
}
