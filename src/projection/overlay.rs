//! Overlay of an annotation table on native declarations.

use std::iter;

use crate::{
    annotations::AnnotationTable,
    metadata::{
        customattributes::{merge_inherited, AttributeKind, CustomAttributeRc},
        introspection::ElementRef,
    },
    projection::{Projection, Projector},
};

/// The projection that merges an [`AnnotationTable`] into attribute queries.
///
/// The declared set of an element is its native declarations followed by the table entries for
/// that exact element. Inherited queries walk the element's predecessors (base types for types,
/// overridden members for methods, properties and events) and merge the declared sets level by
/// level with [`merge_inherited`]:
///
/// - attributes of the queried element itself are always included
/// - attributes of predecessors are included only when their kind is `Inherited`
/// - a kind that is not `AllowMultiple` is masked by any more-derived instance of that kind
///
/// Fields, constructors, parameters and return values have no predecessors. Assemblies have no
/// table slot and report their native attributes.
///
/// The overlay holds no mutable state and can be shared across threads.
#[derive(Clone, Debug)]
pub struct AttributeOverlay {
    table: AnnotationTable,
}

impl AttributeOverlay {
    /// Create an overlay for `table`
    ///
    /// ## Arguments
    /// * 'table' - The frozen annotation table
    #[must_use]
    pub fn new(table: AnnotationTable) -> Self {
        AttributeOverlay { table }
    }

    /// The table this overlay consults
    #[must_use]
    pub fn table(&self) -> &AnnotationTable {
        &self.table
    }

    /// Native declarations of `element` followed by its table entries
    fn declared(&self, element: ElementRef<'_>) -> Vec<CustomAttributeRc> {
        let mut declared = element.custom_attributes(None, false);
        declared.extend(self.table.attributes_for(element));
        declared
    }
}

impl Projection for AttributeOverlay {
    type State = ();

    fn resolve_attributes(
        &self,
        _state: &(),
        element: ElementRef<'_>,
        kind: Option<&AttributeKind>,
        inherit: bool,
    ) -> Vec<CustomAttributeRc> {
        let own = iter::once(self.declared(element));
        if !inherit {
            return merge_inherited(own, kind);
        }

        match element {
            ElementRef::Type(ty) => {
                let bases = iter::successors(ty.base_type(), |base| base.base_type())
                    .map(|base| self.declared(ElementRef::Type(base.as_ref())));
                merge_inherited(own.chain(bases), kind)
            }
            ElementRef::Method(method) => {
                let overridden =
                    iter::successors(method.overridden_method(), |m| m.overridden_method())
                        .map(|m| self.declared(ElementRef::Method(m.as_ref())));
                merge_inherited(own.chain(overridden), kind)
            }
            ElementRef::Property(property) => {
                let overridden =
                    iter::successors(property.overridden_property(), |p| p.overridden_property())
                        .map(|p| self.declared(ElementRef::Property(p.as_ref())));
                merge_inherited(own.chain(overridden), kind)
            }
            ElementRef::Event(event) => {
                let overridden =
                    iter::successors(event.overridden_event(), |e| e.overridden_event())
                        .map(|e| self.declared(ElementRef::Event(e.as_ref())));
                merge_inherited(own.chain(overridden), kind)
            }
            ElementRef::Assembly(assembly) => match kind {
                Some(kind) => assembly.custom_attributes_of(kind, true),
                None => assembly.custom_attributes(true),
            },
            ElementRef::Field(_) | ElementRef::Parameter(_) => merge_inherited(own, kind),
        }
    }
}

impl Projector for AttributeOverlay {
    type Projection = AttributeOverlay;

    fn projection(&self) -> &AttributeOverlay {
        self
    }
}
