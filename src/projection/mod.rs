//! Projection of external attributes onto the introspection surface.
//!
//! A projection wraps host elements in [`Projected`] wrappers. A wrapper behaves exactly like
//! the element it wraps, except that attribute queries are answered by its [`Projection`]
//! strategy. Every navigation (base type, members, parameters, accessors, overridden members,
//! assembly types, generic arguments) returns wrapped elements again, so the projection is
//! transparent at every depth.
//!
//! # Key Components
//!
//! - [`Projection`] - Strategy answering attribute queries and wrapping navigated elements
//! - [`Projector`] - Front door projecting host elements, unwrapping already projected ones
//! - [`Projected`] - The generic wrapper, one instantiation per element kind
//! - [`AttributeOverlay`] - Merges native declarations with an
//!   [`crate::annotations::AnnotationTable`]
//! - [`CachingProjector`] - Memoizing decorator around any projection
//!
//! # Examples
//!
//! ```rust
//! use attrscope::annotations::AnnotationTableBuilder;
//! use attrscope::metadata::customattributes::{AttributeKind, AttributeUsage, CustomAttribute};
//! use attrscope::metadata::introspection::AttributeProvider;
//! use attrscope::metadata::typesystem::{TypeBuilder, TypeRegistry};
//! use attrscope::projection::{AttributeOverlay, Projector};
//!
//! let registry = TypeRegistry::new("Sample");
//! let entity = TypeBuilder::class("Sample", "Entity").build(&registry)?;
//! let order = TypeBuilder::class("Sample", "Order").extends(&entity).build(&registry)?;
//!
//! let table_name = AttributeKind::new("Sample", "TableAttribute")
//!     .with_usage(AttributeUsage::new(true, false))
//!     .into_rc();
//!
//! let mut builder = AnnotationTableBuilder::new();
//! builder.add_type_attributes(entity.as_ref(), [CustomAttribute::new(&table_name).into_rc()])?;
//!
//! let overlay = AttributeOverlay::new(builder.create_table());
//! let projected = overlay.project_type(order.clone());
//!
//! assert!(projected.is_defined(&table_name, true));
//! assert!(!projected.is_defined(&table_name, false));
//! # Ok::<(), attrscope::Error>(())
//! ```

mod cache;
mod overlay;
mod projected;

use std::sync::Arc;

pub use cache::{CachedProjection, CachedState, CachingProjector};
pub use overlay::AttributeOverlay;
pub use projected::{Projected, ProjectedElement};

use crate::metadata::{
    customattributes::{AttributeKind, CustomAttributeRc},
    introspection::{
        AssemblyRc, ElementRef, EventRc, FieldRc, MemberRef, MethodRc, ParameterRc, PropertyRc,
        TypeRc,
    },
};

/// Strategy behind a family of [`Projected`] wrappers.
///
/// Implementors answer attribute queries for host elements and decide how navigated elements
/// are wrapped. The `wrap_*` defaults create a fresh wrapper per call; caching strategies
/// override them to hand out shared wrappers.
pub trait Projection: Clone + Send + Sync + 'static {
    /// Per-wrapper state, created with `Default` for every new wrapper
    type State: Default + Send + Sync + 'static;

    /// Answer an attribute query for a host element
    ///
    /// ## Arguments
    /// * 'state'   - The state of the wrapper the query arrived at
    /// * 'element' - The wrapped host element
    /// * 'kind'    - Optional kind filter, matching derived kinds
    /// * 'inherit' - Whether to include attributes inherited from predecessors
    fn resolve_attributes(
        &self,
        state: &Self::State,
        element: ElementRef<'_>,
        kind: Option<&AttributeKind>,
        inherit: bool,
    ) -> Vec<CustomAttributeRc>;

    /// Wrap a host type
    fn wrap_type(&self, inner: TypeRc) -> TypeRc {
        Arc::new(Projected::new(inner, self.clone()))
    }

    /// Wrap a host method or constructor
    fn wrap_method(&self, inner: MethodRc) -> MethodRc {
        Arc::new(Projected::new(inner, self.clone()))
    }

    /// Wrap a host field
    fn wrap_field(&self, inner: FieldRc) -> FieldRc {
        Arc::new(Projected::new(inner, self.clone()))
    }

    /// Wrap a host property
    fn wrap_property(&self, inner: PropertyRc) -> PropertyRc {
        Arc::new(Projected::new(inner, self.clone()))
    }

    /// Wrap a host event
    fn wrap_event(&self, inner: EventRc) -> EventRc {
        Arc::new(Projected::new(inner, self.clone()))
    }

    /// Wrap a host parameter or return value slot
    fn wrap_parameter(&self, inner: ParameterRc) -> ParameterRc {
        Arc::new(Projected::new(inner, self.clone()))
    }

    /// Wrap a host assembly
    fn wrap_assembly(&self, inner: AssemblyRc) -> AssemblyRc {
        Arc::new(Projected::new(inner, self.clone()))
    }
}

/// Follow `underlying` links down to the host element
fn innermost<T: ?Sized>(mut element: Arc<T>, underlying: impl Fn(&T) -> Option<Arc<T>>) -> Arc<T> {
    while let Some(inner) = underlying(&*element) {
        element = inner;
    }
    element
}

/// Front door for projecting host elements.
///
/// Inputs that are already projected, by this or any other projection, are unwrapped to the
/// host element first, so projecting twice never applies a table twice.
pub trait Projector {
    /// The strategy wrappers are created with
    type Projection: Projection;

    /// The strategy wrappers are created with
    fn projection(&self) -> &Self::Projection;

    /// Project a type
    fn project_type(&self, ty: TypeRc) -> TypeRc {
        self.projection().wrap_type(innermost(ty, |ty| ty.underlying()))
    }

    /// Project an assembly
    fn project_assembly(&self, assembly: AssemblyRc) -> AssemblyRc {
        self.projection()
            .wrap_assembly(innermost(assembly, |assembly| assembly.underlying()))
    }

    /// Project a method or constructor
    fn project_method(&self, method: MethodRc) -> MethodRc {
        self.projection()
            .wrap_method(innermost(method, |method| method.underlying()))
    }

    /// Project a field
    fn project_field(&self, field: FieldRc) -> FieldRc {
        self.projection().wrap_field(innermost(field, |field| field.underlying()))
    }

    /// Project a property
    fn project_property(&self, property: PropertyRc) -> PropertyRc {
        self.projection()
            .wrap_property(innermost(property, |property| property.underlying()))
    }

    /// Project an event
    fn project_event(&self, event: EventRc) -> EventRc {
        self.projection().wrap_event(innermost(event, |event| event.underlying()))
    }

    /// Project a parameter or return value slot
    fn project_parameter(&self, parameter: ParameterRc) -> ParameterRc {
        self.projection()
            .wrap_parameter(innermost(parameter, |parameter| parameter.underlying()))
    }

    /// Project any member, keeping its kind
    fn project_member(&self, member: MemberRef) -> MemberRef {
        match member {
            MemberRef::Type(ty) => MemberRef::Type(self.project_type(ty)),
            MemberRef::Method(method) => MemberRef::Method(self.project_method(method)),
            MemberRef::Field(field) => MemberRef::Field(self.project_field(field)),
            MemberRef::Property(property) => MemberRef::Property(self.project_property(property)),
            MemberRef::Event(event) => MemberRef::Event(self.project_event(event)),
        }
    }
}
