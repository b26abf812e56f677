//! Integration tests for the attribute overlay and the caching decorator.
//!
//! Every scenario builds a small hierarchy with the reference type system, stages external
//! attributes, and checks what projected elements report against the inheritance rules.

use std::sync::Arc;

use attrscope::prelude::*;
use rayon::prelude::*;

fn kind(name: &str, inherited: bool, allow_multiple: bool) -> AttributeKindRc {
    AttributeKind::new("Tests.Projection", name)
        .with_usage(AttributeUsage::new(inherited, allow_multiple))
        .into_rc()
}

fn attr(kind: &AttributeKindRc) -> CustomAttributeRc {
    CustomAttribute::new(kind).into_rc()
}

fn tagged(kind: &AttributeKindRc, tag: &str) -> CustomAttributeRc {
    CustomAttribute::new(kind)
        .with_arg(CustomAttributeArgument::String(tag.to_string()))
        .into_rc()
}

fn tags(attrs: &[CustomAttributeRc]) -> Vec<String> {
    attrs
        .iter()
        .map(|a| match a.fixed_args.first() {
            Some(CustomAttributeArgument::String(tag)) => tag.clone(),
            _ => a.kind.name.clone(),
        })
        .collect()
}

/// `Entity` <- `Order`, each with a virtual `Save(Int32)`, a virtual `Total` property,
/// a shadowing `Describe()` and a `Put` overload pair on the base.
struct Shop {
    registry: Arc<TypeRegistry>,
    entity: CilTypeRc,
    order: CilTypeRc,
}

fn shop() -> Result<Shop> {
    let registry = TypeRegistry::new("Shop");
    let int32 = registry.get_primitive(CilPrimitiveKind::I4)?;
    let int64 = registry.get_primitive(CilPrimitiveKind::I8)?;
    let string = registry.get_primitive(CilPrimitiveKind::String)?;

    let entity = TypeBuilder::class("Shop", "Entity").build(&registry)?;
    MethodBuilder::new("Save")
        .modifiers(MethodModifiers::VIRTUAL)
        .parameter("mode", &int32)
        .build(&entity)?;
    MethodBuilder::new("Describe")
        .modifiers(MethodModifiers::VIRTUAL)
        .returns(&string)
        .build(&entity)?;
    MethodBuilder::new("Put").parameter("value", &int32).build(&entity)?;
    MethodBuilder::new("Put").parameter("value", &int64).build(&entity)?;
    PropertyBuilder::new("Total", &int32)
        .modifiers(MethodModifiers::VIRTUAL)
        .build(&entity)?;
    FieldBuilder::new("id", &int32).build(&entity)?;

    let order = TypeBuilder::class("Shop", "Order")
        .extends(&entity)
        .build(&registry)?;
    MethodBuilder::new("Save")
        .modifiers(MethodModifiers::VIRTUAL)
        .parameter("mode", &int32)
        .build(&order)?;
    MethodBuilder::new("Describe")
        .modifiers(MethodModifiers::VIRTUAL | MethodModifiers::NEW_SLOT)
        .returns(&string)
        .build(&order)?;
    PropertyBuilder::new("Total", &int32)
        .modifiers(MethodModifiers::VIRTUAL)
        .build(&order)?;

    Ok(Shop {
        registry,
        entity,
        order,
    })
}

fn only_method(ty: &TypeRc, signature: &str) -> MethodRc {
    ty.methods()
        .into_iter()
        .find(|m| m.signature() == signature)
        .unwrap_or_else(|| panic!("{signature} not declared on {}", ty.full_name()))
}

fn query<E: AttributeProvider + ?Sized>(
    element: &E,
    filter: Option<&AttributeKind>,
    inherit: bool,
) -> Vec<CustomAttributeRc> {
    match filter {
        Some(kind) => element.custom_attributes_of(kind, inherit),
        None => element.custom_attributes(inherit),
    }
}

#[test]
fn test_round_trip() -> Result<()> {
    let shop = shop()?;
    let audited = kind("Audited", false, false);

    let mut builder = AnnotationTableBuilder::new();
    builder.add_type_attributes(shop.order.as_ref(), [attr(&audited)])?;
    let overlay = AttributeOverlay::new(builder.create_table());

    let order = overlay.project_type(shop.order.clone());
    assert!(order.is_defined(&audited, false));
    assert!(order.is_defined(&audited, true));
    assert_eq!(order.custom_attributes_of(&audited, true).len(), 1);
    assert!(shop.order.custom_attributes(true).is_empty());
    Ok(())
}

#[test]
fn test_non_inherited_masking() -> Result<()> {
    let shop = shop()?;
    let local = kind("Local", false, true);
    let flowing = kind("Flowing", true, true);

    let mut builder = AnnotationTableBuilder::new();
    builder.add_type_attributes(shop.entity.as_ref(), [attr(&local), attr(&flowing)])?;
    let overlay = AttributeOverlay::new(builder.create_table());

    let order = overlay.project_type(shop.order.clone());
    assert!(!order.is_defined(&local, true));
    assert!(order.is_defined(&flowing, true));
    assert!(!order.is_defined(&flowing, false));

    let entity = overlay.project_type(shop.entity.clone());
    assert!(entity.is_defined(&local, true));
    Ok(())
}

#[test]
fn test_single_instance_override() -> Result<()> {
    let shop = shop()?;
    let label = kind("Label", true, false);
    let note = kind("Note", true, true);

    let mut builder = AnnotationTableBuilder::new();
    builder
        .add_type_attributes(
            shop.entity.as_ref(),
            [tagged(&label, "base"), tagged(&note, "base note")],
        )?
        .add_type_attributes(
            shop.order.as_ref(),
            [tagged(&label, "derived"), tagged(&note, "derived note")],
        )?
        .add_selected_attributes(shop.entity.as_ref(), "Save(Int32)", [tagged(&label, "base save")])?
        .add_selected_attributes(shop.order.as_ref(), "Save(Int32)", [tagged(&label, "derived save")])?;
    let overlay = AttributeOverlay::new(builder.create_table());

    let order = overlay.project_type(shop.order.clone());
    assert_eq!(tags(&order.custom_attributes_of(&label, true)), ["derived"]);
    assert_eq!(
        tags(&order.custom_attributes(true)),
        ["derived", "derived note", "base note"]
    );

    let save = only_method(&order, "Save(System.Int32)");
    assert_eq!(tags(&save.custom_attributes(true)), ["derived save"]);
    Ok(())
}

#[test]
fn test_native_and_table_order_across_levels() -> Result<()> {
    let registry = TypeRegistry::new("Shop");
    let note = kind("Note", true, true);
    let base = TypeBuilder::class("Shop", "Base")
        .attribute(tagged(&note, "base native"))
        .build(&registry)?;
    let derived = TypeBuilder::class("Shop", "Derived")
        .extends(&base)
        .attribute(tagged(&note, "derived native"))
        .build(&registry)?;

    let mut builder = AnnotationTableBuilder::new();
    builder
        .add_type_attributes(base.as_ref(), [tagged(&note, "base table")])?
        .add_type_attributes(derived.as_ref(), [tagged(&note, "derived table")])?;
    let overlay = AttributeOverlay::new(builder.create_table());

    let projected = overlay.project_type(derived.clone());
    assert_eq!(
        tags(&projected.custom_attributes(true)),
        ["derived native", "derived table", "base native", "base table"]
    );
    Ok(())
}

#[test]
fn test_overload_isolation() -> Result<()> {
    let shop = shop()?;
    let range = kind("Range", true, true);

    let mut builder = AnnotationTableBuilder::new();
    builder.add_selected_attributes(shop.entity.as_ref(), "Put(Int32)[0]", [attr(&range)])?;
    let overlay = AttributeOverlay::new(builder.create_table());

    let entity = overlay.project_type(shop.entity.clone());
    let narrow = only_method(&entity, "Put(System.Int32)");
    let wide = only_method(&entity, "Put(System.Int64)");
    assert!(narrow.parameters()[0].is_defined(&range, true));
    assert!(!wide.parameters()[0].is_defined(&range, true));
    assert!(!narrow.is_defined(&range, true));
    Ok(())
}

#[test]
fn test_hiding_breaks_inheritance() -> Result<()> {
    let shop = shop()?;
    let flowing = kind("Flowing", true, true);

    let mut builder = AnnotationTableBuilder::new();
    builder
        .add_selected_attributes(shop.entity.as_ref(), "Describe()", [attr(&flowing)])?
        .add_selected_attributes(shop.entity.as_ref(), "Save(Int32)", [attr(&flowing)])?
        .add_property_attributes(shop.entity.as_ref(), "Total", [attr(&flowing)])?;
    let overlay = AttributeOverlay::new(builder.create_table());

    let order = overlay.project_type(shop.order.clone());
    let describe = only_method(&order, "Describe()");
    assert!(describe.overridden_method().is_none());
    assert!(!describe.is_defined(&flowing, true));

    let save = only_method(&order, "Save(System.Int32)");
    assert!(save.is_defined(&flowing, true));
    assert!(!save.parameters()[0].is_defined(&flowing, true));

    let total = order.property("Total").unwrap();
    assert!(total.is_defined(&flowing, true));
    assert!(!total.is_defined(&flowing, false));
    Ok(())
}

/// `Widget` with a virtual `Changed` event and `Size` property, overridden by `Button` and
/// re-declared in new slots by `Slider`.
struct Widgets {
    widget: CilTypeRc,
    button: CilTypeRc,
    slider: CilTypeRc,
}

fn widgets() -> Result<Widgets> {
    let registry = TypeRegistry::new("Widgets");
    let int32 = registry.get_primitive(CilPrimitiveKind::I4)?;
    let delegate = registry.get_primitive(CilPrimitiveKind::Delegate)?;

    let widget = TypeBuilder::class("Widgets", "Widget").build(&registry)?;
    EventBuilder::new("Changed", &delegate)
        .modifiers(MethodModifiers::VIRTUAL)
        .build(&widget)?;
    PropertyBuilder::new("Size", &int32)
        .getter()
        .modifiers(MethodModifiers::VIRTUAL)
        .build(&widget)?;

    let button = TypeBuilder::class("Widgets", "Button")
        .extends(&widget)
        .build(&registry)?;
    EventBuilder::new("Changed", &delegate)
        .modifiers(MethodModifiers::VIRTUAL)
        .build(&button)?;
    PropertyBuilder::new("Size", &int32)
        .getter()
        .modifiers(MethodModifiers::VIRTUAL)
        .build(&button)?;

    let slider = TypeBuilder::class("Widgets", "Slider")
        .extends(&widget)
        .build(&registry)?;
    EventBuilder::new("Changed", &delegate)
        .modifiers(MethodModifiers::VIRTUAL | MethodModifiers::NEW_SLOT)
        .build(&slider)?;
    PropertyBuilder::new("Size", &int32)
        .getter()
        .modifiers(MethodModifiers::VIRTUAL | MethodModifiers::NEW_SLOT)
        .build(&slider)?;

    Ok(Widgets {
        widget,
        button,
        slider,
    })
}

#[test]
fn test_event_inheritance() -> Result<()> {
    let widgets = widgets()?;
    let note = kind("Note", true, true);
    let label = kind("Label", true, false);

    let mut builder = AnnotationTableBuilder::new();
    builder.add_event_attributes(
        widgets.widget.as_ref(),
        "Changed",
        [tagged(&note, "widget note"), tagged(&label, "widget")],
    )?;
    let base_only = builder.create_table();
    builder.add_event_attributes(widgets.button.as_ref(), "Changed", [tagged(&label, "button")])?;
    let both_levels = builder.create_table();

    let overlay = AttributeOverlay::new(base_only);
    let changed = overlay
        .project_type(widgets.button.clone())
        .event("Changed")
        .unwrap();
    assert!(changed.overridden_event().is_some());
    assert_eq!(tags(&changed.custom_attributes_of(&note, true)), ["widget note"]);
    assert_eq!(tags(&changed.custom_attributes_of(&label, true)), ["widget"]);
    assert!(!changed.is_defined(&note, false));

    let overlay = AttributeOverlay::new(both_levels.clone());
    let projector = CachingProjector::new(both_levels);
    for button in [
        overlay.project_type(widgets.button.clone()),
        projector.project_type(widgets.button.clone()),
    ] {
        let changed = button.event("Changed").unwrap();
        assert_eq!(tags(&changed.custom_attributes_of(&label, true)), ["button"]);
        assert_eq!(
            tags(&changed.custom_attributes(true)),
            ["button", "widget note"]
        );
        assert_eq!(tags(&changed.custom_attributes(false)), ["button"]);
    }
    Ok(())
}

#[test]
fn test_new_slot_property_and_event() -> Result<()> {
    let widgets = widgets()?;
    let flowing = kind("Flowing", true, true);

    let mut builder = AnnotationTableBuilder::new();
    builder
        .add_event_attributes(widgets.widget.as_ref(), "Changed", [attr(&flowing)])?
        .add_property_attributes(widgets.widget.as_ref(), "Size", [attr(&flowing)])?;
    let overlay = AttributeOverlay::new(builder.create_table());

    let slider = overlay.project_type(widgets.slider.clone());
    let changed = slider.event("Changed").unwrap();
    assert!(changed.overridden_event().is_none());
    assert!(!changed.is_defined(&flowing, true));
    let size = slider.property("Size").unwrap();
    assert!(size.overridden_property().is_none());
    assert!(!size.is_defined(&flowing, true));

    let button = overlay.project_type(widgets.button.clone());
    assert!(button.event("Changed").unwrap().is_defined(&flowing, true));
    assert!(button.property("Size").unwrap().is_defined(&flowing, true));
    Ok(())
}

#[test]
fn test_same_name_assemblies_stay_apart() -> Result<()> {
    let first = shop()?;
    let second = shop()?;
    let audited = kind("Audited", false, false);
    assert_eq!(first.order.token, second.order.token);

    let mut builder = AnnotationTableBuilder::new();
    builder.add_type_attributes(first.order.as_ref(), [attr(&audited)])?;
    let projector = CachingProjector::new(builder.create_table());

    let first_order = projector.project_type(first.order.clone());
    let second_order = projector.project_type(second.order.clone());
    assert!(!Arc::ptr_eq(&first_order, &second_order));
    assert!(first_order.is_defined(&audited, false));
    assert!(!second_order.is_defined(&audited, false));

    let first_assembly = projector.project_assembly(first.registry.clone());
    let second_assembly = projector.project_assembly(second.registry.clone());
    assert!(!Arc::ptr_eq(&first_assembly, &second_assembly));
    assert_eq!(projector.cached_types(), 2);
    Ok(())
}

#[test]
fn test_generic_definition_sharing() -> Result<()> {
    let shop = shop()?;
    let tracked = kind("Tracked", false, false);
    let int32 = shop.registry.get_primitive(CilPrimitiveKind::I4)?;
    let string = shop.registry.get_primitive(CilPrimitiveKind::String)?;

    let container = TypeBuilder::class("Shop", "Container`1")
        .generic_params(&["T"])
        .build(&shop.registry)?;
    FieldBuilder::new("size", &int32).build(&container)?;
    let of_int = shop.registry.make_generic_instance(&container, &[int32])?;
    let of_string = shop.registry.make_generic_instance(&container, &[string])?;

    let mut builder = AnnotationTableBuilder::new();
    builder
        .add_type_attributes(container.as_ref(), [attr(&tracked)])?
        .add_field_attributes(container.as_ref(), "size", [attr(&tracked)])?;
    let projector = CachingProjector::new(builder.create_table());

    for instance in [&of_int, &of_string] {
        let projected = projector.project_type(instance.clone());
        assert!(projected.is_defined(&tracked, false));
        assert!(projected.field("size").unwrap().is_defined(&tracked, false));
    }

    let first = projector.project_type(of_int.clone());
    let second = projector.project_type(of_string.clone());
    assert!(!Arc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn test_navigation_stays_projected() -> Result<()> {
    let shop = shop()?;
    let marker = kind("Marker", true, true);
    let assembly_marker = kind("AssemblyMarker", false, false);
    shop.registry.add_custom_attribute(attr(&assembly_marker));

    let mut builder = AnnotationTableBuilder::new();
    builder
        .add_type_attributes(shop.entity.as_ref(), [attr(&marker)])?
        .add_field_attributes(shop.entity.as_ref(), "id", [attr(&marker)])?;
    let overlay = AttributeOverlay::new(builder.create_table());

    let order = overlay.project_type(shop.order.clone());
    let entity = order.base_type().unwrap();
    assert!(entity.underlying().is_some());
    assert!(entity.is_defined(&marker, false));
    assert!(entity.field("id").unwrap().is_defined(&marker, false));

    let save = only_method(&order, "Save(System.Int32)");
    let declaring = save.declaring_type().unwrap();
    assert!(declaring.underlying().is_some());
    assert!(declaring.is_defined(&marker, true));
    assert!(save.overridden_method().unwrap().underlying().is_some());

    let assembly = order.assembly().unwrap();
    assert!(assembly.underlying().is_some());
    assert!(assembly.is_defined(&assembly_marker, true));
    let via_assembly = assembly.get_type("Shop.Entity").unwrap();
    assert!(via_assembly.is_defined(&marker, false));

    for member in entity.members() {
        let element = member.as_element();
        let projected = match &member {
            MemberRef::Type(ty) => ty.underlying().is_some(),
            MemberRef::Method(method) => method.underlying().is_some(),
            MemberRef::Field(field) => field.underlying().is_some(),
            MemberRef::Property(property) => property.underlying().is_some(),
            MemberRef::Event(event) => event.underlying().is_some(),
        };
        assert!(projected, "{} was not projected", element.kind());
    }
    Ok(())
}

#[test]
fn test_projecting_twice_applies_once() -> Result<()> {
    let shop = shop()?;
    let note = kind("Note", true, true);

    let mut builder = AnnotationTableBuilder::new();
    builder.add_type_attributes(shop.order.as_ref(), [attr(&note)])?;
    let table = builder.create_table();
    let overlay = AttributeOverlay::new(table.clone());
    let projector = CachingProjector::new(table);

    let once = overlay.project_type(shop.order.clone());
    let twice = projector.project_type(overlay.project_type(once.clone()));
    assert_eq!(twice.custom_attributes(true).len(), 1);

    let member = projector.project_member(MemberRef::Type(once));
    assert_eq!(member.custom_attributes(true).len(), 1);
    Ok(())
}

#[test]
fn test_cache_transparency() -> Result<()> {
    let shop = shop()?;
    let label = kind("Label", true, false);
    let note = kind("Note", true, true);
    let local = kind("Local", false, true);

    let mut builder = AnnotationTableBuilder::new();
    builder
        .add_type_attributes(shop.entity.as_ref(), [attr(&label), attr(&note), attr(&local)])?
        .add_type_attributes(shop.order.as_ref(), [attr(&label)])?
        .add_selected_attributes(shop.entity.as_ref(), "Save(Int32)", [attr(&note)])?
        .add_selected_attributes(shop.entity.as_ref(), "Save(Int32)[0]", [attr(&note)])?
        .add_property_attributes(shop.entity.as_ref(), "Total", [attr(&label)])?;
    let table = builder.create_table();
    let overlay = AttributeOverlay::new(table.clone());
    let projector = CachingProjector::new(table);

    let filters: [Option<&AttributeKind>; 4] =
        [None, Some(label.as_ref()), Some(note.as_ref()), Some(local.as_ref())];
    for _ in 0..3 {
        for ty in [&shop.entity, &shop.order] {
            let cached = projector.project_type(ty.clone());
            let uncached = overlay.project_type(ty.clone());
            assert_eq!(cached.full_name(), uncached.full_name());

            for inherit in [false, true] {
                for filter in filters {
                    assert_eq!(
                        query(cached.as_ref(), filter, inherit),
                        query(uncached.as_ref(), filter, inherit)
                    );

                    let save_cached = only_method(&cached, "Save(System.Int32)");
                    let save_uncached = only_method(&uncached, "Save(System.Int32)");
                    assert_eq!(
                        query(save_cached.as_ref(), filter, inherit),
                        query(save_uncached.as_ref(), filter, inherit)
                    );
                    assert_eq!(
                        query(save_cached.parameters()[0].as_ref(), filter, inherit),
                        query(save_uncached.parameters()[0].as_ref(), filter, inherit)
                    );

                    let total_cached = cached.property("Total").unwrap();
                    let total_uncached = uncached.property("Total").unwrap();
                    assert_eq!(
                        query(total_cached.as_ref(), filter, inherit),
                        query(total_uncached.as_ref(), filter, inherit)
                    );
                }
            }
        }
    }
    assert_eq!(projector.cached_types(), 2);
    Ok(())
}

#[test]
fn test_concurrent_reads() -> Result<()> {
    let shop = shop()?;
    let note = kind("Note", true, true);
    let label = kind("Label", true, false);

    let mut builder = AnnotationTableBuilder::new();
    builder
        .add_type_attributes(shop.entity.as_ref(), [attr(&note), attr(&label)])?
        .add_type_attributes(shop.order.as_ref(), [attr(&label)])?
        .add_selected_attributes(shop.entity.as_ref(), "Save(Int32)", [attr(&note)])?;
    let table = builder.create_table();
    let expected = AttributeOverlay::new(table.clone())
        .project_type(shop.order.clone())
        .custom_attributes(true);
    let projector = CachingProjector::new(table);

    let results: Vec<(Vec<CustomAttributeRc>, bool)> = (0..64)
        .into_par_iter()
        .map(|_| {
            let order = projector.project_type(shop.order.clone());
            let save = only_method(&order, "Save(System.Int32)");
            (order.custom_attributes(true), save.is_defined(&note, true))
        })
        .collect();

    for (attributes, save_has_note) in results {
        assert_eq!(attributes, expected);
        assert!(save_has_note);
    }
    assert_eq!(projector.cached_types(), 1);
    Ok(())
}
