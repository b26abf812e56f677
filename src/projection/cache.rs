//! Memoizing decorator for projections.
//!
//! [`CachingProjector`] hands out one wrapper instance per exact host element, and every wrapper
//! it creates memoizes its attribute query results. Both caches are filled lazily and tolerate
//! concurrent first access: wrappers are first-insert-wins, query results are computed outside
//! any lock and inserted afterwards, so a race computes the same value twice at worst.
//!
//! Cached wrappers reach the cache through a [`Weak`] link. The cache owns the wrappers, never
//! the reverse, and wrappers that outlive their projector keep working without caching.

use std::{
    fmt,
    hash::Hash,
    sync::{Arc, Weak},
};

use dashmap::DashMap;
use log::{debug, trace};

use crate::{
    annotations::AnnotationTable,
    metadata::{
        customattributes::{AttributeKind, CustomAttributeRc},
        introspection::{
            AssemblyRc, ElementRef, EventRc, FieldRc, MemberInfo, MethodInfo, MethodRc,
            ParameterRc, PropertyRc, TypeHandle, TypeRc,
        },
        token::Token,
    },
    projection::{AttributeOverlay, Projected, Projection, Projector},
};

/// Exact identity of a member for caching purposes
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MemberCacheKey {
    declaring: Option<TypeHandle>,
    token: Token,
    arguments: Vec<TypeHandle>,
}

impl MemberCacheKey {
    fn of<M: MemberInfo + ?Sized>(member: &M) -> Self {
        MemberCacheKey {
            declaring: member.declaring_type().map(|ty| ty.handle()),
            token: member.token(),
            arguments: Vec::new(),
        }
    }

    fn of_method(method: &dyn MethodInfo) -> Self {
        let mut key = MemberCacheKey::of(method);
        key.arguments = method
            .generic_arguments()
            .iter()
            .map(|argument| argument.handle())
            .collect();
        key
    }
}

/// Wrapper instances shared by every projection of one [`CachingProjector`]
#[derive(Default)]
struct CacheState {
    types: DashMap<TypeHandle, TypeRc>,
    methods: DashMap<MemberCacheKey, MethodRc>,
    fields: DashMap<MemberCacheKey, FieldRc>,
    properties: DashMap<MemberCacheKey, PropertyRc>,
    events: DashMap<MemberCacheKey, EventRc>,
    parameters: DashMap<(MemberCacheKey, i32), ParameterRc>,
    assemblies: DashMap<(String, u64), AssemblyRc>,
}

impl CacheState {
    fn member_count(&self) -> usize {
        self.methods.len()
            + self.fields.len()
            + self.properties.len()
            + self.events.len()
            + self.parameters.len()
    }

    fn clear(&self) {
        self.types.clear();
        self.methods.clear();
        self.fields.clear();
        self.properties.clear();
        self.events.clear();
        self.parameters.clear();
        self.assemblies.clear();
    }
}

/// Look up `key`, creating and inserting the value on a miss. The first inserted value wins.
///
/// The key is only cloned on a miss.
fn get_or_create<K, V>(map: &DashMap<K, V>, key: &K, create: impl FnOnce() -> V) -> V
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    if let Some(hit) = map.get(key) {
        return hit.value().clone();
    }

    let created = create();
    map.entry(key.clone()).or_insert(created).value().clone()
}

/// Per-wrapper state of a [`CachedProjection`]: the attribute memo plus the inner state
pub struct CachedState<S> {
    /// Unfiltered results by `inherit`
    unfiltered: DashMap<bool, Vec<CustomAttributeRc>>,
    /// Filtered results by kind, indexed by `inherit`
    filtered: [DashMap<AttributeKind, Vec<CustomAttributeRc>>; 2],
    inner: S,
}

impl<S> CachedState<S> {
    /// Number of memoized attribute queries
    #[must_use]
    pub fn memoized(&self) -> usize {
        self.unfiltered.len() + self.filtered.iter().map(DashMap::len).sum::<usize>()
    }

    /// The state of the decorated projection
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Default> Default for CachedState<S> {
    fn default() -> Self {
        CachedState {
            unfiltered: DashMap::new(),
            filtered: [DashMap::new(), DashMap::new()],
            inner: S::default(),
        }
    }
}

impl<S> fmt::Debug for CachedState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedState")
            .field("memoized", &self.memoized())
            .finish_non_exhaustive()
    }
}

/// A projection decorated with wrapper sharing and result memoization.
///
/// Attribute queries are answered by the decorated projection once per wrapper and
/// `(inherit, kind)` pair. Navigated elements are wrapped through the owning
/// [`CachingProjector`]'s cache.
#[derive(Clone)]
pub struct CachedProjection<P: Projection> {
    inner: P,
    cache: Weak<CacheState>,
}

impl<P: Projection> CachedProjection<P> {
    /// The decorated projection
    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: Projection + fmt::Debug> fmt::Debug for CachedProjection<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedProjection")
            .field("inner", &self.inner)
            .field("cache_alive", &(self.cache.strong_count() > 0))
            .finish()
    }
}

impl<P: Projection> Projection for CachedProjection<P> {
    type State = CachedState<P::State>;

    fn resolve_attributes(
        &self,
        state: &Self::State,
        element: ElementRef<'_>,
        kind: Option<&AttributeKind>,
        inherit: bool,
    ) -> Vec<CustomAttributeRc> {
        let resolve = || {
            trace!(
                "Resolving attributes of {} '{}' (inherit: {inherit})",
                element.kind(),
                element_name(element)
            );
            self.inner
                .resolve_attributes(&state.inner, element, kind, inherit)
        };

        match kind {
            Some(kind) => get_or_create(&state.filtered[usize::from(inherit)], kind, resolve),
            None => get_or_create(&state.unfiltered, &inherit, resolve),
        }
    }

    fn wrap_type(&self, inner: TypeRc) -> TypeRc {
        let Some(cache) = self.cache.upgrade() else {
            return Arc::new(Projected::new(inner, self.clone()));
        };

        get_or_create(&cache.types, &inner.handle(), || {
            trace!("Caching projected type {}", inner.full_name());
            Arc::new(Projected::new(inner.clone(), self.clone()))
        })
    }

    fn wrap_method(&self, inner: MethodRc) -> MethodRc {
        let Some(cache) = self.cache.upgrade() else {
            return Arc::new(Projected::new(inner, self.clone()));
        };

        get_or_create(&cache.methods, &MemberCacheKey::of_method(inner.as_ref()), || {
            trace!("Caching projected method {}", inner.name());
            Arc::new(Projected::new(inner.clone(), self.clone()))
        })
    }

    fn wrap_field(&self, inner: FieldRc) -> FieldRc {
        let Some(cache) = self.cache.upgrade() else {
            return Arc::new(Projected::new(inner, self.clone()));
        };

        get_or_create(&cache.fields, &MemberCacheKey::of(inner.as_ref()), || {
            trace!("Caching projected field {}", inner.name());
            Arc::new(Projected::new(inner.clone(), self.clone()))
        })
    }

    fn wrap_property(&self, inner: PropertyRc) -> PropertyRc {
        let Some(cache) = self.cache.upgrade() else {
            return Arc::new(Projected::new(inner, self.clone()));
        };

        get_or_create(&cache.properties, &MemberCacheKey::of(inner.as_ref()), || {
            trace!("Caching projected property {}", inner.name());
            Arc::new(Projected::new(inner.clone(), self.clone()))
        })
    }

    fn wrap_event(&self, inner: EventRc) -> EventRc {
        let Some(cache) = self.cache.upgrade() else {
            return Arc::new(Projected::new(inner, self.clone()));
        };

        get_or_create(&cache.events, &MemberCacheKey::of(inner.as_ref()), || {
            trace!("Caching projected event {}", inner.name());
            Arc::new(Projected::new(inner.clone(), self.clone()))
        })
    }

    fn wrap_parameter(&self, inner: ParameterRc) -> ParameterRc {
        let cache = self.cache.upgrade();
        let method = inner.member();
        let (Some(cache), Some(method)) = (cache, method) else {
            return Arc::new(Projected::new(inner, self.clone()));
        };

        let key = (MemberCacheKey::of_method(method.as_ref()), inner.position());
        get_or_create(&cache.parameters, &key, || {
            trace!(
                "Caching projected parameter {} of {}",
                inner.position(),
                method.name()
            );
            Arc::new(Projected::new(inner.clone(), self.clone()))
        })
    }

    fn wrap_assembly(&self, inner: AssemblyRc) -> AssemblyRc {
        let Some(cache) = self.cache.upgrade() else {
            return Arc::new(Projected::new(inner, self.clone()));
        };

        let key = (inner.name().to_string(), inner.module_id());
        get_or_create(&cache.assemblies, &key, || {
            trace!("Caching projected assembly {}", inner.name());
            Arc::new(Projected::new(inner.clone(), self.clone()))
        })
    }
}

fn element_name(element: ElementRef<'_>) -> &str {
    match element {
        ElementRef::Type(ty) => ty.name(),
        ElementRef::Method(method) => method.name(),
        ElementRef::Field(field) => field.name(),
        ElementRef::Property(property) => property.name(),
        ElementRef::Event(event) => event.name(),
        ElementRef::Parameter(parameter) => parameter.name().unwrap_or_default(),
        ElementRef::Assembly(assembly) => assembly.name(),
    }
}

/// A [`Projector`] that memoizes wrappers and attribute query results.
///
/// Results are identical to those of the decorated projection; repeated projection of the same
/// host element returns the same wrapper instance. Types are cached by their exact
/// [`TypeHandle`], so two instantiations of one generic type get separate wrappers that resolve
/// against the same table entries.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use attrscope::annotations::AnnotationTableBuilder;
/// use attrscope::metadata::typesystem::{TypeBuilder, TypeRegistry};
/// use attrscope::projection::{CachingProjector, Projector};
///
/// let registry = TypeRegistry::new("Sample");
/// let widget = TypeBuilder::class("Sample", "Widget").build(&registry)?;
///
/// let projector = CachingProjector::new(AnnotationTableBuilder::new().create_table());
/// let first = projector.project_type(widget.clone());
/// let second = projector.project_type(widget.clone());
/// assert!(Arc::ptr_eq(&first, &second));
/// # Ok::<(), attrscope::Error>(())
/// ```
pub struct CachingProjector<P: Projection = AttributeOverlay> {
    cache: Arc<CacheState>,
    projection: CachedProjection<P>,
}

impl CachingProjector {
    /// Create a caching projector over an [`AttributeOverlay`] for `table`
    ///
    /// ## Arguments
    /// * 'table' - The frozen annotation table
    #[must_use]
    pub fn new(table: AnnotationTable) -> Self {
        CachingProjector::with_projection(AttributeOverlay::new(table))
    }
}

impl<P: Projection> CachingProjector<P> {
    /// Create a caching projector decorating `projection`
    ///
    /// ## Arguments
    /// * 'projection' - The projection whose results are memoized
    #[must_use]
    pub fn with_projection(projection: P) -> Self {
        let cache = Arc::new(CacheState::default());
        let projection = CachedProjection {
            inner: projection,
            cache: Arc::downgrade(&cache),
        };
        CachingProjector { cache, projection }
    }

    /// Drop every cached wrapper.
    ///
    /// Wrappers handed out earlier stay valid; later projections create new instances.
    pub fn clear(&self) {
        debug!(
            "Clearing projection cache ({} types, {} members)",
            self.cache.types.len(),
            self.cache.member_count()
        );
        self.cache.clear();
    }

    /// Number of cached type wrappers
    #[must_use]
    pub fn cached_types(&self) -> usize {
        self.cache.types.len()
    }

    /// Number of cached method, field, property, event and parameter wrappers
    #[must_use]
    pub fn cached_members(&self) -> usize {
        self.cache.member_count()
    }
}

impl<P: Projection> Projector for CachingProjector<P> {
    type Projection = CachedProjection<P>;

    fn projection(&self) -> &CachedProjection<P> {
        &self.projection
    }
}

impl<P: Projection + fmt::Debug> fmt::Debug for CachingProjector<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingProjector")
            .field("projection", &self.projection.inner)
            .field("cached_types", &self.cached_types())
            .field("cached_members", &self.cached_members())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annotations::AnnotationTableBuilder,
        metadata::{
            customattributes::{AttributeKindRc, AttributeUsage, CustomAttribute},
            introspection::AttributeProvider,
            typesystem::{
                CilPrimitiveKind, CilTypeRc, MethodBuilder, MethodModifiers, TypeBuilder,
                TypeRegistry,
            },
        },
    };

    struct Fixture {
        marker: AttributeKindRc,
        base: CilTypeRc,
        derived: CilTypeRc,
        table: AnnotationTable,
    }

    fn fixture() -> Fixture {
        let marker = AttributeKind::new("Test", "Marker")
            .with_usage(AttributeUsage::new(true, true))
            .into_rc();
        let registry = TypeRegistry::new("Tests");
        let int32 = registry.get_primitive(CilPrimitiveKind::I4).unwrap();
        let base = TypeBuilder::class("Tests", "Base").build(&registry).unwrap();
        MethodBuilder::new("Run")
            .modifiers(MethodModifiers::VIRTUAL)
            .parameter("x", &int32)
            .build(&base)
            .unwrap();
        let derived = TypeBuilder::class("Tests", "Derived")
            .extends(&base)
            .build(&registry)
            .unwrap();
        MethodBuilder::new("Run")
            .modifiers(MethodModifiers::VIRTUAL)
            .parameter("x", &int32)
            .build(&derived)
            .unwrap();

        let mut builder = AnnotationTableBuilder::new();
        builder
            .add_type_attributes(base.as_ref(), [CustomAttribute::new(&marker).into_rc()])
            .unwrap()
            .add_selected_attributes(
                base.as_ref(),
                "Run(Int32)",
                [CustomAttribute::new(&marker).into_rc()],
            )
            .unwrap();

        Fixture {
            marker,
            base,
            derived,
            table: builder.create_table(),
        }
    }

    #[test]
    fn test_same_wrapper_instances() {
        let fixture = fixture();
        let projector = CachingProjector::new(fixture.table.clone());

        let first = projector.project_type(fixture.derived.clone());
        let second = projector.project_type(fixture.derived.clone());
        assert!(Arc::ptr_eq(&first, &second));

        let via_base = projector.project_type(fixture.base.clone());
        assert!(Arc::ptr_eq(&first.base_type().unwrap(), &via_base));

        let run = first.methods_named("Run").remove(0);
        assert!(Arc::ptr_eq(&run, &second.methods_named("Run")[0]));
        assert!(Arc::ptr_eq(
            &run.parameters()[0],
            &first.methods_named("Run")[0].parameters()[0]
        ));
        assert!(Arc::ptr_eq(&run.declaring_type().unwrap(), &first));
        assert_eq!(projector.cached_types(), 2);
    }

    #[test]
    fn test_results_match_uncached() {
        let fixture = fixture();
        let projector = CachingProjector::new(fixture.table.clone());
        let overlay = AttributeOverlay::new(fixture.table.clone());

        let cached = projector.project_type(fixture.derived.clone());
        let uncached = overlay.project_type(fixture.derived.clone());
        for _ in 0..2 {
            for inherit in [false, true] {
                assert_eq!(
                    cached.custom_attributes(inherit),
                    uncached.custom_attributes(inherit)
                );
                assert_eq!(
                    cached.custom_attributes_of(&fixture.marker, inherit),
                    uncached.custom_attributes_of(&fixture.marker, inherit)
                );
                assert_eq!(
                    cached.methods_named("Run")[0].custom_attributes(inherit),
                    uncached.methods_named("Run")[0].custom_attributes(inherit)
                );
            }
        }
        assert!(cached.is_defined(&fixture.marker, true));
        assert!(!cached.is_defined(&fixture.marker, false));
    }

    #[test]
    fn test_memo_keyed_by_kind_identity() {
        let fixture = fixture();
        let projector = CachingProjector::new(fixture.table.clone());
        let ty: TypeRc = fixture.derived.clone();
        let wrapper = Projected::new(ty, projector.projection().clone());

        let expected = wrapper.custom_attributes_of(&fixture.marker, true);
        assert_eq!(expected.len(), 1);
        assert_eq!(wrapper.state().memoized(), 1);

        // A distinct instance of the same kind hits the existing entry
        let same_kind = AttributeKind::new("Test", "Marker").into_rc();
        assert_eq!(wrapper.custom_attributes_of(&same_kind, true), expected);
        assert_eq!(wrapper.state().memoized(), 1);

        wrapper.custom_attributes_of(&fixture.marker, false);
        wrapper.custom_attributes(true);
        wrapper.custom_attributes(true);
        assert_eq!(wrapper.state().memoized(), 3);
    }

    #[test]
    fn test_clear_creates_new_instances() {
        let fixture = fixture();
        let projector = CachingProjector::new(fixture.table.clone());

        let before = projector.project_type(fixture.derived.clone());
        before.methods_named("Run");
        assert!(projector.cached_members() > 0);

        projector.clear();
        assert_eq!(projector.cached_types(), 0);
        assert_eq!(projector.cached_members(), 0);

        let after = projector.project_type(fixture.derived.clone());
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.custom_attributes(true), after.custom_attributes(true));
    }

    #[test]
    fn test_wrappers_outlive_projector() {
        let fixture = fixture();
        let projected = {
            let projector = CachingProjector::new(fixture.table.clone());
            projector.project_type(fixture.derived.clone())
        };

        let base = projected.base_type().unwrap();
        assert!(base.is_defined(&fixture.marker, false));
        assert!(base.underlying().is_some());
    }

    #[test]
    fn test_unwraps_projected_input() {
        let fixture = fixture();
        let projector = CachingProjector::new(fixture.table.clone());
        let overlay = AttributeOverlay::new(fixture.table.clone());

        let from_overlay = overlay.project_type(fixture.base.clone());
        let cached = projector.project_type(from_overlay);
        assert_eq!(cached.custom_attributes(false).len(), 1);
        assert!(Arc::ptr_eq(&cached, &projector.project_type(fixture.base.clone())));
    }
}
