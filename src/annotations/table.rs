//! The frozen annotation table.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    annotations::{
        identity::{MethodKey, SimpleMemberKey, TypeComparer, TypeIdentity},
        metadata::{MethodAnnotations, TypeAnnotations},
    },
    metadata::{
        customattributes::CustomAttributeRc,
        introspection::{ElementRef, MemberInfo, MethodInfo, ParameterInfo, TypeHandle, TypeInfo},
    },
};

/// Immutable mapping from declaring types to their externally attached attributes.
///
/// Produced by [`crate::annotations::AnnotationTableBuilder::create_table`]. Lookups are total:
/// a type without entries yields [`TypeAnnotations::empty`]. The table performs no inheritance
/// and no merging with native declarations; that is the job of the projection layer.
///
/// The table is `Send + Sync` and can be shared freely across threads.
///
/// # Examples
///
/// ```rust
/// use attrscope::annotations::AnnotationTableBuilder;
/// use attrscope::metadata::customattributes::{AttributeKind, CustomAttribute};
/// use attrscope::metadata::introspection::TypeInfo;
/// use attrscope::metadata::typesystem::{TypeBuilder, TypeRegistry};
///
/// let registry = TypeRegistry::new("Sample");
/// let order = TypeBuilder::class("Sample", "Order").build(&registry)?;
/// let audited = AttributeKind::new("Sample", "AuditedAttribute").into_rc();
///
/// let mut builder = AnnotationTableBuilder::new();
/// builder.add_type_attributes(order.as_ref(), [CustomAttribute::new(&audited).into_rc()])?;
///
/// let table = builder.create_table();
/// assert_eq!(table.type_annotations(&order.handle()).type_attributes().len(), 1);
/// # Ok::<(), attrscope::Error>(())
/// ```
#[derive(Clone)]
pub struct AnnotationTable {
    types: Arc<HashMap<TypeIdentity, TypeAnnotations>>,
    comparer: Arc<dyn TypeComparer>,
}

impl AnnotationTable {
    pub(crate) fn new(
        types: Arc<HashMap<TypeIdentity, TypeAnnotations>>,
        comparer: Arc<dyn TypeComparer>,
    ) -> Self {
        AnnotationTable { types, comparer }
    }

    /// Annotations stored for the type `handle` identifies under this table's comparer
    ///
    /// ## Arguments
    /// * 'handle' - Exact handle of the declaring type
    #[must_use]
    pub fn type_annotations(&self, handle: &TypeHandle) -> &TypeAnnotations {
        self.types
            .get(&self.comparer.identity(handle))
            .unwrap_or(TypeAnnotations::empty())
    }

    /// Annotations of the declaring type of a member, if it still has one
    fn declaring(&self, declaring: Option<&dyn TypeInfo>) -> &TypeAnnotations {
        match declaring {
            Some(declaring) => self.type_annotations(&declaring.handle()),
            None => TypeAnnotations::empty(),
        }
    }

    /// Annotations of one method or constructor overload
    ///
    /// ## Arguments
    /// * 'method' - The method, matched by declaring type and [`MethodKey`]
    #[must_use]
    pub fn method_annotations(&self, method: &dyn MethodInfo) -> Option<MethodAnnotations> {
        let declaring = method.declaring_type();
        self.declaring(declaring.as_deref())
            .method(&MethodKey::of(method))
            .cloned()
    }

    /// The attributes attached to exactly this element, in insertion order
    ///
    /// Assemblies have no slot in the table and always yield an empty list.
    ///
    /// ## Arguments
    /// * 'element' - Any program element
    #[must_use]
    pub fn attributes_for(&self, element: ElementRef<'_>) -> Vec<CustomAttributeRc> {
        match element {
            ElementRef::Type(ty) => self.type_annotations(&ty.handle()).type_attributes().to_vec(),
            ElementRef::Method(method) => self
                .method_annotations(method)
                .map(|annotations| annotations.method().to_vec())
                .unwrap_or_default(),
            ElementRef::Field(field) => self.simple_member(field),
            ElementRef::Property(property) => self.simple_member(property),
            ElementRef::Event(event) => self.simple_member(event),
            ElementRef::Parameter(parameter) => self.parameter(parameter),
            ElementRef::Assembly(_) => Vec::new(),
        }
    }

    fn simple_member<M: MemberInfo + ?Sized>(&self, member: &M) -> Vec<CustomAttributeRc> {
        let declaring = member.declaring_type();
        self.declaring(declaring.as_deref())
            .member(&SimpleMemberKey::of(member))
            .to_vec()
    }

    fn parameter(&self, parameter: &dyn ParameterInfo) -> Vec<CustomAttributeRc> {
        let Some(method) = parameter.member() else {
            return Vec::new();
        };
        let Some(annotations) = self.method_annotations(method.as_ref()) else {
            return Vec::new();
        };

        match usize::try_from(parameter.position()) {
            Ok(position) => annotations.parameter(position).to_vec(),
            Err(_) => annotations.return_value().to_vec(),
        }
    }

    /// Number of annotated types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no type is annotated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The comparer the table was built with
    #[must_use]
    pub fn comparer(&self) -> &dyn TypeComparer {
        self.comparer.as_ref()
    }
}

impl fmt::Debug for AnnotationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationTable")
            .field("types", &self.types.len())
            .field("comparer", &self.comparer)
            .finish()
    }
}
