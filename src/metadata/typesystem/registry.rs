//! Central type registry of one assembly.
//!
//! The `TypeRegistry` owns every type of an assembly and plays the assembly's part in the
//! introspection model: it implements [`AssemblyInfo`] and carries the assembly-level
//! attributes.
//!
//! # Registry Architecture
//!
//! - **Token-based lookup**: Type definitions in a `SkipMap`, ordered by token
//! - **Name-based lookup**: A `DashMap` index from full name to token
//! - **Constructed types**: Generic instances, arrays and by-refs are created on demand and
//!   deduplicated by their [`TypeHandle`], so equal constructions yield the same `Arc`
//! - **Token generation**: One counter per table
//! - **Module identity**: Every registry draws a process-unique module id, so two registries
//!   sharing an assembly name never produce equal [`TypeHandle`]s
//!
//! # Examples
//!
//! ```rust
//! use attrscope::metadata::introspection::{AssemblyInfo, TypeInfo};
//! use attrscope::metadata::typesystem::{CilPrimitiveKind, TypeBuilder, TypeRegistry};
//!
//! let registry = TypeRegistry::new("Sample");
//! let list = TypeBuilder::class("Sample", "List`1")
//!     .generic_params(&["T"])
//!     .build(&registry)?;
//! let int32 = registry.get_primitive(CilPrimitiveKind::I4)?;
//!
//! let a = registry.make_generic_instance(&list, &[int32.clone()])?;
//! let b = registry.make_generic_instance(&list, &[int32])?;
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! assert!(registry.get_type("Sample.List`1").is_some());
//! # Ok::<(), attrscope::Error>(())
//! ```

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Weak,
};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    metadata::{
        customattributes::CustomAttributeRc,
        introspection::{AssemblyInfo, AttributeProvider, TypeHandle, TypeRc},
        token::{TableId, Token},
        typesystem::{CilFlavor, CilPrimitiveKind, CilType, CilTypeRc, CustomAttributeList},
    },
    Error::TypeError,
    Result,
};

static NEXT_MODULE_ID: AtomicU64 = AtomicU64::new(1);

/// Owner of all types of one assembly, with the runtime primitives pre-registered
pub struct TypeRegistry {
    /// Simple name of the assembly
    name: Arc<str>,
    /// Process-unique identifier of this registry
    module: u64,
    /// Link to the `Arc` owning this registry, handed to the types it creates
    me: Weak<TypeRegistry>,
    /// Type definitions indexed by token
    types: SkipMap<Token, CilTypeRc>,
    /// Secondary index: definitions by full name (namespace.name)
    types_by_fullname: DashMap<String, Token>,
    /// Generic instances, arrays and by-refs, by identity
    constructed: DashMap<TypeHandle, CilTypeRc>,
    /// Last row handed out, per table
    rows: DashMap<TableId, u32>,
    /// Assembly-level attributes
    custom_attributes: CustomAttributeList,
}

impl TypeRegistry {
    /// Create a new registry with the primitive types registered
    ///
    /// ## Arguments
    /// * 'name' - Simple name of the assembly
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new_cyclic(|me| {
            let name: Arc<str> = Arc::from(name);
            let module = NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed);
            let types = SkipMap::new();
            let types_by_fullname = DashMap::new();

            for kind in CilPrimitiveKind::iter() {
                let token = kind.token();
                let flavor = if kind.is_value_type() {
                    CilFlavor::ValueType
                } else {
                    CilFlavor::Class
                };
                let primitive = Arc::new(CilType::new(
                    token,
                    flavor,
                    kind.namespace().to_string(),
                    kind.name().to_string(),
                    TypeHandle::definition(name.clone(), module, token),
                    me.clone(),
                ));
                types_by_fullname.insert(primitive.fullname(), token);
                types.insert(token, primitive);
            }

            for kind in CilPrimitiveKind::iter() {
                if let (Some(base), Some(entry)) = (kind.base(), types.get(&kind.token())) {
                    if let Some(base_entry) = types.get(&base.token()) {
                        // Freshly created types, setting the base cannot fail
                        let _ = entry.value().set_base(base_entry.value());
                    }
                }
            }

            let rows = DashMap::new();
            rows.insert(
                TableId::TypeDef,
                u32::try_from(CilPrimitiveKind::COUNT).unwrap_or(u32::MAX),
            );

            TypeRegistry {
                name,
                module,
                me: me.clone(),
                types,
                types_by_fullname,
                constructed: DashMap::new(),
                rows,
                custom_attributes: Arc::new(boxcar::Vec::new()),
            }
        })
    }

    /// Simple name of the assembly
    #[must_use]
    pub fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }

    /// Handle of the type definition at `token` in this registry
    pub(crate) fn definition_handle(&self, token: Token) -> TypeHandle {
        TypeHandle::definition(self.name.clone(), self.module, token)
    }

    pub(crate) fn weak(&self) -> Weak<TypeRegistry> {
        self.me.clone()
    }

    /// Allocate the next token of `table`
    ///
    /// ## Arguments
    /// * 'table' - The table to allocate a row in
    pub fn next_token(&self, table: TableId) -> Token {
        let mut row = self.rows.entry(table).or_insert(0);
        *row += 1;
        Token::from_parts(table, *row)
    }

    /// Insert a type definition into the registry
    ///
    /// ## Arguments
    /// * 'new_type' - The type to register
    ///
    /// # Errors
    /// Returns an error if a type with the same full name is already registered.
    pub fn insert(&self, new_type: &CilTypeRc) -> Result<()> {
        let fullname = new_type.fullname();
        match self.types_by_fullname.entry(fullname) {
            Entry::Occupied(entry) => Err(TypeError(format!(
                "Type '{}' is already defined",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(new_type.token);
                self.types.insert(new_type.token, new_type.clone());
                Ok(())
            }
        }
    }

    /// Get a primitive type
    ///
    /// ## Arguments
    /// * 'primitive' - The kind of primitive to look up
    ///
    /// # Errors
    /// Returns an error if the primitive type is not found in the registry.
    pub fn get_primitive(&self, primitive: CilPrimitiveKind) -> Result<CilTypeRc> {
        self.get(&primitive.token()).ok_or_else(|| {
            TypeError(format!("Primitive '{}' is not registered", primitive.name()))
        })
    }

    /// Look up a type definition by its token
    ///
    /// ## Arguments
    /// * 'token' - The token to look up
    pub fn get(&self, token: &Token) -> Option<CilTypeRc> {
        self.types.get(token).map(|entry| entry.value().clone())
    }

    /// Look up a type definition by its full name
    ///
    /// ## Arguments
    /// * 'fullname' - Namespace and name, e.g. `System.String`
    pub fn get_by_fullname(&self, fullname: &str) -> Option<CilTypeRc> {
        self.types_by_fullname
            .get(fullname)
            .and_then(|token| self.get(token.value()))
    }

    /// Look up any type, definition or constructed, by its exact handle
    pub fn get_by_handle(&self, handle: &TypeHandle) -> Option<CilTypeRc> {
        match handle {
            TypeHandle::Definition {
                assembly,
                module,
                token,
            } if *module == self.module && **assembly == *self.name => self.get(token),
            _ => self
                .constructed
                .get(handle)
                .map(|entry| entry.value().clone()),
        }
    }

    /// Instantiate a generic type definition
    ///
    /// The instance shares members and attributes with the definition. Equal instantiations
    /// return the same type.
    ///
    /// ## Arguments
    /// * 'definition' - The generic type definition
    /// * 'arguments'  - One type argument per generic parameter
    ///
    /// # Errors
    /// Returns an error if `definition` is not a generic type definition or the argument count
    /// does not match.
    pub fn make_generic_instance(
        &self,
        definition: &CilTypeRc,
        arguments: &[CilTypeRc],
    ) -> Result<CilTypeRc> {
        if !definition.is_generic_definition() {
            return Err(TypeError(format!(
                "'{}' is not a generic type definition",
                definition.fullname()
            )));
        }
        if definition.generic_params.count() != arguments.len() {
            return Err(TypeError(format!(
                "'{}' expects {} type arguments, got {}",
                definition.fullname(),
                definition.generic_params.count(),
                arguments.len()
            )));
        }

        let handle = TypeHandle::Constructed {
            definition: Box::new(definition.handle.clone()),
            arguments: arguments.iter().map(|arg| arg.handle.clone()).collect(),
        };

        let entry = self.constructed.entry(handle.clone()).or_insert_with(|| {
            let mut instance = CilType::new(
                self.next_token(TableId::TypeSpec),
                CilFlavor::GenericInstance,
                definition.namespace.clone(),
                definition.name.clone(),
                handle,
                self.me.clone(),
            );
            instance.modifiers = definition.modifiers;
            instance.generic_args = arguments.to_vec();
            instance.generic_definition = Some(definition.clone());
            instance.custom_attributes = definition.custom_attributes.clone();

            let instance = Arc::new(instance);
            if let Some(base) = definition.base() {
                let _ = instance.set_base(&base);
            }
            instance
        });

        Ok(entry.value().clone())
    }

    /// Get the single-dimensional array type of `element`
    pub fn make_array(&self, element: &CilTypeRc) -> CilTypeRc {
        self.make_wrapped(element, CilFlavor::Array)
    }

    /// Get the by-ref type of `element`
    pub fn make_by_ref(&self, element: &CilTypeRc) -> CilTypeRc {
        self.make_wrapped(element, CilFlavor::ByRef)
    }

    fn make_wrapped(&self, element: &CilTypeRc, flavor: CilFlavor) -> CilTypeRc {
        let (handle, suffix) = if flavor == CilFlavor::Array {
            (TypeHandle::Array(Box::new(element.handle.clone())), "[]")
        } else {
            (TypeHandle::ByRef(Box::new(element.handle.clone())), "&")
        };

        let entry = self.constructed.entry(handle.clone()).or_insert_with(|| {
            let mut wrapped = CilType::new(
                self.next_token(TableId::TypeSpec),
                flavor,
                element.namespace.clone(),
                format!("{}{suffix}", element.name),
                handle,
                self.me.clone(),
            );
            wrapped.element = Some(element.clone());

            let wrapped = Arc::new(wrapped);
            if let Some(object) = self.get(&CilPrimitiveKind::Object.token()) {
                let _ = wrapped.set_base(&object);
            }
            wrapped
        });

        entry.value().clone()
    }

    /// Create a generic parameter placeholder
    pub(crate) fn create_generic_parameter(
        &self,
        name: &str,
        handle: TypeHandle,
    ) -> Result<CilTypeRc> {
        if name.is_empty() {
            return Err(TypeError(
                "Generic parameter name must not be empty".to_string(),
            ));
        }

        let param = Arc::new(CilType::new(
            self.next_token(TableId::GenericParam),
            CilFlavor::GenericParameter,
            String::new(),
            name.to_string(),
            handle,
            self.me.clone(),
        ));
        param.set_base(&self.get_primitive(CilPrimitiveKind::Object)?)?;
        Ok(param)
    }

    /// Add an assembly-level attribute
    pub fn add_custom_attribute(&self, attribute: CustomAttributeRc) {
        self.custom_attributes.push(attribute);
    }

    /// Returns the number of type definitions, primitives included
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if there are no types in the registry
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Get an iterator over all type definitions, in token order
    pub fn iter(&self) -> crossbeam_skiplist::map::Iter<'_, Token, CilTypeRc> {
        self.types.iter()
    }

    /// Get a snapshot of all type definitions
    pub fn all_types(&self) -> Vec<CilTypeRc> {
        self.types.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl AttributeProvider for TypeRegistry {
    fn custom_attributes(&self, _inherit: bool) -> Vec<CustomAttributeRc> {
        self.custom_attributes
            .iter()
            .map(|(_, attr)| attr.clone())
            .collect()
    }
}

impl AssemblyInfo for TypeRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn module_id(&self) -> u64 {
        self.module
    }

    fn types(&self) -> Vec<TypeRc> {
        self.types
            .iter()
            .map(|entry| entry.value().clone() as TypeRc)
            .collect()
    }

    fn get_type(&self, full_name: &str) -> Option<TypeRc> {
        self.get_by_fullname(full_name).map(|ty| ty as TypeRc)
    }
}
