//! Custom attribute representation and inheritance rules.
//!
//! This module provides the attribute vocabulary shared by every other part of the crate:
//!
//! - [`CustomAttribute`] - An attribute instance (kind plus arguments), opaque to the table
//! - [`AttributeKind`] - The kind an instance belongs to, with optional base kind
//! - [`AttributeUsage`] - The `Inherited` / `AllowMultiple` policy a kind declares
//! - [`merge_inherited`] - The merge of per-level declarations into an inherited view
//!
//! # Usage Policy Resolution
//!
//! A kind's effective usage is the one it declares itself, else the one of its nearest base
//! kind that declares one, else `Inherited = true, AllowMultiple = false`. This mirrors how
//! `AttributeUsageAttribute` is itself inherited by attribute subclasses in .NET.
//!
//! # Examples
//!
//! ```rust
//! use attrscope::metadata::customattributes::{
//!     AttributeKind, AttributeUsage, CustomAttribute, CustomAttributeArgument,
//! };
//!
//! let description = AttributeKind::new("System.ComponentModel", "DescriptionAttribute")
//!     .with_usage(AttributeUsage::new(true, false))
//!     .into_rc();
//!
//! let attr = CustomAttribute::new(&description)
//!     .with_arg(CustomAttributeArgument::String("Primary key".into()))
//!     .into_rc();
//!
//! assert!(attr.is_instance_of(&description));
//! assert_eq!(attr.fixed_args.len(), 1);
//! ```

mod inheritance;
mod types;

pub use inheritance::{filter_by_kind, merge_inherited, MAX_INHERITANCE_DEPTH};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_default() {
        let kind = AttributeKind::new("Test", "Plain");
        assert_eq!(kind.declared_usage(), None);
        assert_eq!(kind.usage(), AttributeUsage::new(true, false));
    }

    #[test]
    fn test_usage_inherited_from_base_kind() {
        let base = AttributeKind::new("Test", "Base")
            .with_usage(AttributeUsage::new(false, true))
            .into_rc();
        let middle = AttributeKind::new("Test", "Middle").with_base(&base).into_rc();
        let leaf = AttributeKind::new("Test", "Leaf").with_base(&middle);

        assert_eq!(leaf.usage(), AttributeUsage::new(false, true));
    }

    #[test]
    fn test_usage_own_declaration_wins() {
        let base = AttributeKind::new("Test", "Base")
            .with_usage(AttributeUsage::new(false, true))
            .into_rc();
        let leaf = AttributeKind::new("Test", "Leaf")
            .with_base(&base)
            .with_usage(AttributeUsage::new(true, false));

        assert_eq!(leaf.usage(), AttributeUsage::new(true, false));
    }

    #[test]
    fn test_kind_equality_by_fullname() {
        let a = AttributeKind::new("Test", "Same");
        let b = AttributeKind::new("Test", "Same").with_usage(AttributeUsage::new(false, false));
        let c = AttributeKind::new("Other", "Same");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.fullname(), "Test.Same");
        assert_eq!(AttributeKind::new("", "Global").fullname(), "Global");
    }

    #[test]
    fn test_assignable_is_not_symmetric() {
        let base = AttributeKind::new("Test", "Base").into_rc();
        let derived = AttributeKind::new("Test", "Derived").with_base(&base).into_rc();

        assert!(derived.is_assignable_to(&base));
        assert!(!base.is_assignable_to(&derived));
    }

    #[test]
    fn test_named_arguments() {
        let kind = AttributeKind::new("Test", "Display").into_rc();
        let attr = CustomAttribute::new(&kind)
            .with_property("Name", CustomAttributeArgument::String("Id".into()))
            .with_field("Order", CustomAttributeArgument::I4(3));

        assert_eq!(
            attr.named("Name"),
            Some(&CustomAttributeArgument::String("Id".into()))
        );
        assert_eq!(attr.named_args[1].arg_type, "System.Int32");
        assert!(attr.named_args[1].is_field);
        assert_eq!(attr.named("Missing"), None);
    }
}
