//! Attribute inheritance and multiplicity resolution.
//!
//! Both the reference type model and the projection overlay answer inherited attribute queries
//! the same way: the element's own declarations form level 0, each logical predecessor (base
//! type, overridden method, overridden property or event) forms the next level, and the levels
//! are merged from most-derived to least-derived:
//!
//! - Level 0 contributes every instance.
//! - Deeper levels contribute only instances whose kind is `Inherited`.
//! - A kind that is not `AllowMultiple` is masked at a level once a more-derived level
//!   contributed an instance of that kind.
//!
//! Ordering is preserved: more-derived levels first, declaration order within a level.

use std::collections::HashSet;

use log::warn;

use crate::metadata::customattributes::{AttributeKind, AttributeKindRc, CustomAttributeRc};

/// Maximum number of levels an inheritance walk visits before it stops.
///
/// Host type graphs are trusted to be acyclic; the guard keeps a malformed host from turning
/// an attribute query into an endless loop.
pub const MAX_INHERITANCE_DEPTH: usize = 256;

/// Keep the attributes that are instances of `kind` (all of them when `kind` is `None`)
///
/// ## Arguments
/// * 'attributes' - The attributes to filter, order is preserved
/// * 'kind'       - The requested kind, matching derived kinds as well
#[must_use]
pub fn filter_by_kind(
    attributes: Vec<CustomAttributeRc>,
    kind: Option<&AttributeKind>,
) -> Vec<CustomAttributeRc> {
    match kind {
        Some(kind) => attributes
            .into_iter()
            .filter(|attr| attr.is_instance_of(kind))
            .collect(),
        None => attributes,
    }
}

/// Merge per-level declared attribute sets into the inherited view of an element
///
/// `levels` yields the declared set of the element itself first, followed by the declared sets
/// of its predecessors, most-derived first. The iterator is consumed lazily, so callers can
/// compute levels on demand.
///
/// ## Arguments
/// * 'levels' - Declared attribute sets, one per inheritance level
/// * 'kind'   - Optional kind filter, applied before masking
#[must_use]
pub fn merge_inherited<I>(levels: I, kind: Option<&AttributeKind>) -> Vec<CustomAttributeRc>
where
    I: IntoIterator<Item = Vec<CustomAttributeRc>>,
{
    let mut result = Vec::new();
    let mut masked: HashSet<AttributeKindRc> = HashSet::new();

    for (depth, level) in levels.into_iter().enumerate() {
        if depth >= MAX_INHERITANCE_DEPTH {
            warn!(
                "Attribute inheritance walk stopped after {} levels",
                MAX_INHERITANCE_DEPTH
            );
            break;
        }

        let mut single_use = Vec::new();
        for attr in level {
            if kind.is_some_and(|kind| !attr.is_instance_of(kind)) {
                continue;
            }

            let usage = attr.kind.usage();
            if depth > 0 && (!usage.inherited || (!usage.allow_multiple && masked.contains(&attr.kind))) {
                continue;
            }

            if !usage.allow_multiple {
                single_use.push(attr.kind.clone());
            }
            result.push(attr);
        }

        // Masking applies to strictly less-derived levels only
        masked.extend(single_use);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::customattributes::{AttributeUsage, CustomAttribute};

    fn kind(name: &str, inherited: bool, allow_multiple: bool) -> AttributeKindRc {
        AttributeKind::new("Test", name)
            .with_usage(AttributeUsage::new(inherited, allow_multiple))
            .into_rc()
    }

    fn attr(kind: &AttributeKindRc) -> CustomAttributeRc {
        CustomAttribute::new(kind).into_rc()
    }

    #[test]
    fn test_own_level_always_included() {
        let sealed = kind("Sealed", false, false);
        let a = attr(&sealed);
        let b = attr(&sealed);

        let merged = merge_inherited(vec![vec![a.clone(), b.clone()]], None);
        assert_eq!(merged.len(), 2);
        assert!(std::sync::Arc::ptr_eq(&merged[0], &a));
        assert!(std::sync::Arc::ptr_eq(&merged[1], &b));
    }

    #[test]
    fn test_non_inherited_dropped_from_base() {
        let local = kind("Local", false, true);
        let merged = merge_inherited(vec![vec![], vec![attr(&local)]], None);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_single_use_masks_base() {
        let single = kind("Single", true, false);
        let derived = attr(&single);
        let base = attr(&single);

        let merged = merge_inherited(vec![vec![derived.clone()], vec![base]], None);
        assert_eq!(merged.len(), 1);
        assert!(std::sync::Arc::ptr_eq(&merged[0], &derived));
    }

    #[test]
    fn test_single_use_from_base_when_not_redeclared() {
        let single = kind("Single", true, false);
        let base = attr(&single);

        let merged = merge_inherited(vec![vec![], vec![], vec![base.clone()]], None);
        assert_eq!(merged.len(), 1);
        assert!(std::sync::Arc::ptr_eq(&merged[0], &base));
    }

    #[test]
    fn test_multi_use_accumulates_in_order() {
        let multi = kind("Multi", true, true);
        let d = attr(&multi);
        let m = attr(&multi);
        let b = attr(&multi);

        let merged = merge_inherited(vec![vec![d.clone()], vec![m.clone()], vec![b.clone()]], None);
        assert_eq!(merged.len(), 3);
        assert!(std::sync::Arc::ptr_eq(&merged[0], &d));
        assert!(std::sync::Arc::ptr_eq(&merged[1], &m));
        assert!(std::sync::Arc::ptr_eq(&merged[2], &b));
    }

    #[test]
    fn test_kind_filter_includes_derived_kinds() {
        let base_kind = kind("Validation", true, true);
        let derived_kind = AttributeKind::new("Test", "Range")
            .with_base(&base_kind)
            .into_rc();
        let other = kind("Other", true, true);

        let merged = merge_inherited(
            vec![vec![attr(&derived_kind), attr(&other)], vec![attr(&base_kind)]],
            Some(&base_kind),
        );
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|a| a.is_instance_of(&base_kind)));
    }

    #[test]
    fn test_depth_guard_stops_walk() {
        let multi = kind("Multi", true, true);
        let levels = std::iter::repeat_with(|| vec![attr(&multi)]);

        let merged = merge_inherited(levels, None);
        assert_eq!(merged.len(), MAX_INHERITANCE_DEPTH);
    }

    #[test]
    fn test_filter_by_kind_none_keeps_all() {
        let a = kind("A", true, false);
        let b = kind("B", true, false);
        let all = filter_by_kind(vec![attr(&a), attr(&b)], None);
        assert_eq!(all.len(), 2);

        let only_a = filter_by_kind(all, Some(&a));
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].kind.name, "A");
    }
}
