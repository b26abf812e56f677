//! Immutable per-type annotation storage.
//!
//! Every value in this module is persistent: the `with_*` operations return a new value and
//! leave the receiver untouched, sharing unchanged parts through `Arc`. A table snapshot taken
//! from a builder therefore never observes later additions.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{
    annotations::identity::{MethodKey, SimpleMemberKey},
    metadata::customattributes::CustomAttributeRc,
};

/// An ordered, duplicate-permitting list of attributes attached at one location
pub type AttributeList = Arc<[CustomAttributeRc]>;

fn empty_list() -> AttributeList {
    static EMPTY: OnceLock<AttributeList> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::from(Vec::new())).clone()
}

fn append(list: &AttributeList, attributes: &[CustomAttributeRc]) -> AttributeList {
    if attributes.is_empty() {
        return list.clone();
    }

    list.iter().chain(attributes).cloned().collect()
}

/// Annotations attached to one method or constructor overload
#[derive(Clone)]
pub struct MethodAnnotations {
    method: AttributeList,
    return_value: AttributeList,
    parameters: Arc<[AttributeList]>,
}

impl MethodAnnotations {
    /// Create empty annotations for a method with `parameter_count` parameters
    ///
    /// The parameter slot count is fixed for the lifetime of the value.
    ///
    /// ## Arguments
    /// * 'parameter_count' - Number of declared parameters
    #[must_use]
    pub fn new(parameter_count: usize) -> Self {
        MethodAnnotations {
            method: empty_list(),
            return_value: empty_list(),
            parameters: vec![empty_list(); parameter_count].into(),
        }
    }

    /// Attributes attached to the method itself
    #[must_use]
    pub fn method(&self) -> &[CustomAttributeRc] {
        &self.method
    }

    /// Attributes attached to the return value
    #[must_use]
    pub fn return_value(&self) -> &[CustomAttributeRc] {
        &self.return_value
    }

    /// Attributes attached to the parameter at `position`, empty when out of range
    #[must_use]
    pub fn parameter(&self, position: usize) -> &[CustomAttributeRc] {
        self.parameters
            .get(position)
            .map(|list| &list[..])
            .unwrap_or_default()
    }

    /// Number of parameter slots
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Returns `true` if no attribute is attached anywhere
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.method.is_empty()
            && self.return_value.is_empty()
            && self.parameters.iter().all(|list| list.is_empty())
    }

    /// Append method-level attributes
    #[must_use]
    pub fn with_method_attributes(&self, attributes: &[CustomAttributeRc]) -> Self {
        MethodAnnotations {
            method: append(&self.method, attributes),
            ..self.clone()
        }
    }

    /// Append return value attributes
    #[must_use]
    pub fn with_return_value_attributes(&self, attributes: &[CustomAttributeRc]) -> Self {
        MethodAnnotations {
            return_value: append(&self.return_value, attributes),
            ..self.clone()
        }
    }

    /// Append attributes to one parameter slot
    ///
    /// Returns `None` when `position` is not below [`MethodAnnotations::parameter_count`].
    ///
    /// ## Arguments
    /// * 'position'   - Zero-based parameter position
    /// * 'attributes' - The attributes to append
    #[must_use]
    pub fn with_parameter_attributes(
        &self,
        position: usize,
        attributes: &[CustomAttributeRc],
    ) -> Option<Self> {
        let slot = self.parameters.get(position)?;
        let updated = append(slot, attributes);

        let parameters = self
            .parameters
            .iter()
            .enumerate()
            .map(|(index, list)| {
                if index == position {
                    updated.clone()
                } else {
                    list.clone()
                }
            })
            .collect();

        Some(MethodAnnotations {
            parameters,
            ..self.clone()
        })
    }
}

impl fmt::Debug for MethodAnnotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodAnnotations")
            .field("method", &self.method.len())
            .field("return_value", &self.return_value.len())
            .field(
                "parameters",
                &self.parameters.iter().map(|p| p.len()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Annotations attached to one type and its declared members
#[derive(Clone)]
pub struct TypeAnnotations {
    type_level: AttributeList,
    members: Arc<HashMap<SimpleMemberKey, AttributeList>>,
    methods: Arc<HashMap<MethodKey, MethodAnnotations>>,
}

impl TypeAnnotations {
    /// The shared empty value
    #[must_use]
    pub fn empty() -> &'static TypeAnnotations {
        static EMPTY: OnceLock<TypeAnnotations> = OnceLock::new();
        EMPTY.get_or_init(|| TypeAnnotations {
            type_level: empty_list(),
            members: Arc::new(HashMap::new()),
            methods: Arc::new(HashMap::new()),
        })
    }

    /// Attributes attached to the type itself
    #[must_use]
    pub fn type_attributes(&self) -> &[CustomAttributeRc] {
        &self.type_level
    }

    /// Attributes attached to a field, property or event
    #[must_use]
    pub fn member(&self, key: &SimpleMemberKey) -> &[CustomAttributeRc] {
        self.members
            .get(key)
            .map(|list| &list[..])
            .unwrap_or_default()
    }

    /// Annotations of a method or constructor overload
    #[must_use]
    pub fn method(&self, key: &MethodKey) -> Option<&MethodAnnotations> {
        self.methods.get(key)
    }

    /// Iterate the annotated method overloads
    pub fn methods(&self) -> impl Iterator<Item = (&MethodKey, &MethodAnnotations)> {
        self.methods.iter()
    }

    /// Iterate the annotated fields, properties and events
    pub fn members(&self) -> impl Iterator<Item = (&SimpleMemberKey, &AttributeList)> {
        self.members.iter()
    }

    /// Returns `true` if no attribute is attached to the type or any member
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.type_level.is_empty()
            && self.members.values().all(|list| list.is_empty())
            && self.methods.values().all(MethodAnnotations::is_empty)
    }

    /// Append type-level attributes
    #[must_use]
    pub fn with_type_attributes(&self, attributes: &[CustomAttributeRc]) -> Self {
        TypeAnnotations {
            type_level: append(&self.type_level, attributes),
            ..self.clone()
        }
    }

    /// Append attributes to a field, property or event
    ///
    /// ## Arguments
    /// * 'key'        - The member key
    /// * 'attributes' - The attributes to append
    #[must_use]
    pub fn with_member_attributes(
        &self,
        key: SimpleMemberKey,
        attributes: &[CustomAttributeRc],
    ) -> Self {
        let current = self.members.get(&key).cloned().unwrap_or_else(empty_list);

        let mut members = HashMap::clone(&self.members);
        members.insert(key, append(&current, attributes));

        TypeAnnotations {
            members: Arc::new(members),
            ..self.clone()
        }
    }

    /// Replace the annotations of one method overload with the result of `update`
    ///
    /// `update` receives the current annotations, or empty ones with `parameter_count` slots.
    /// Returns `None`, leaving nothing changed, when `update` does.
    ///
    /// ## Arguments
    /// * 'key'             - The overload key
    /// * 'parameter_count' - Slot count used when the overload has no annotations yet
    /// * 'update'          - Produces the new annotations
    #[must_use]
    pub fn with_method<F>(&self, key: MethodKey, parameter_count: usize, update: F) -> Option<Self>
    where
        F: FnOnce(&MethodAnnotations) -> Option<MethodAnnotations>,
    {
        let updated = match self.methods.get(&key) {
            Some(existing) => update(existing)?,
            None => update(&MethodAnnotations::new(parameter_count))?,
        };

        let mut methods = HashMap::clone(&self.methods);
        methods.insert(key, updated);

        Some(TypeAnnotations {
            methods: Arc::new(methods),
            ..self.clone()
        })
    }
}

impl Default for TypeAnnotations {
    fn default() -> Self {
        TypeAnnotations::empty().clone()
    }
}

impl fmt::Debug for TypeAnnotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeAnnotations")
            .field("type_level", &self.type_level.len())
            .field("members", &self.members.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}
