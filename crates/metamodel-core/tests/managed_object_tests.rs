use std::sync::Arc;

use metamodel_core::object::InMemoryObjectManager;
use metamodel_core::{
    Bookmark, DynObject, IntrospectionConfig, ManagedObject, MetaModelContext,
    MetaModelError, ObjectSpecification, Specialization, SpecificationLoader,
};
use serde_json::json;

const CRM: &str = include_str!("fixtures/crm.dom");

fn context() -> (MetaModelContext, Arc<InMemoryObjectManager>) {
    let loader = SpecificationLoader::from_dom(CRM, IntrospectionConfig::default()).expect("loader");
    loader.create_meta_model().expect("create metamodel");
    MetaModelContext::in_memory(loader)
}

fn spec(ctx: &MetaModelContext, type_name: &str) -> Arc<ObjectSpecification> {
    ctx.loader().spec_for_type_or_err(type_name).expect("spec")
}

fn customer(id: &str, name: &str) -> DynObject {
    DynObject::new("crm.Customer")
        .with_id(id)
        .with_property("name", name)
        .with_handler("iconName", |_, _| Ok(json!("vip")))
}

#[test]
fn entity_of_memoizes_its_bookmark() {
    let (ctx, _) = context();
    let customers = spec(&ctx, "crm.Customer");

    let ada = ManagedObject::of(&ctx, &customers, Some(customer("42", "Ada").into_pojo())).expect("of");
    assert_eq!(ada.specialization().expect("specialization"), Specialization::ENTITY);
    assert!(ada.is_bookmark_memoized());
    assert_eq!(
        ada.bookmark().expect("bookmark"),
        Some(Bookmark::new("crm.Customer", "42"))
    );
    assert_eq!(ada.title().expect("title"), "Ada");
    assert_eq!(ada.icon_name().expect("icon"), Some("vip".to_string()));
    assert!(ada.element_specification().expect("element").is_none());
}

#[test]
fn entity_without_id_is_created_but_cannot_be_bookmarked() {
    let (ctx, _) = context();
    let customers = spec(&ctx, "crm.Customer");
    let transient = DynObject::new("crm.Customer").with_property("name", "Bob");

    let object = ManagedObject::of(&ctx, &customers, Some(transient.into_pojo())).expect("of");
    assert!(!object.is_bookmark_memoized());
    assert!(matches!(object.bookmark().unwrap_err(), MetaModelError::IllegalState(_)));
}

#[test]
fn incompatible_pojo_is_rejected() {
    let (ctx, _) = context();
    let customers = spec(&ctx, "crm.Customer");
    let order = DynObject::new("crm.Order").with_id("7").into_pojo();

    let err = ManagedObject::bookmarked(&ctx, &customers, order.clone(), Bookmark::new("crm.Order", "7"))
        .unwrap_err();
    assert!(err.is_illegal_argument());
    assert!(ManagedObject::of(&ctx, &customers, Some(order)).unwrap_err().is_illegal_argument());
}

#[test]
fn bookmark_of_another_type_is_rejected() {
    let (ctx, _) = context();
    let customers = spec(&ctx, "crm.Customer");

    let err = ManagedObject::bookmarked(
        &ctx,
        &customers,
        customer("42", "Ada").into_pojo(),
        Bookmark::new("crm.Order", "42"),
    )
    .unwrap_err();
    assert!(err.is_illegal_argument(), "{err}");

    let party = spec(&ctx, "crm.Party");
    let adapted = ManagedObject::bookmarked(
        &ctx,
        &party,
        customer("42", "Ada").into_pojo(),
        Bookmark::new("crm.Customer", "42"),
    )
    .expect("bookmark of the adapted type");
    assert_eq!(adapted.bookmark().expect("bookmark"), Some(Bookmark::new("crm.Customer", "42")));
}

#[test]
fn pojo_of_a_subclass_adapts_the_specification() {
    let (ctx, _) = context();
    let party = spec(&ctx, "crm.Party");

    let object = ManagedObject::not_bookmarked(&ctx, &party, customer("1", "Ada").into_pojo())
        .expect("not bookmarked");
    assert_eq!(object.specification().expect("spec").type_name(), "crm.Customer");
    assert!(object.specialization().expect("specialization").is_entity());
    assert!(!object.is_bookmark_memoized());
}

#[test]
fn unspecified_is_shared_and_has_nothing() {
    let unspecified = ManagedObject::unspecified();
    assert!(std::ptr::eq(unspecified, ManagedObject::unspecified()));
    assert_eq!(
        unspecified.specialization().expect("specialization"),
        Specialization::UNSPECIFIED
    );
    assert_eq!(unspecified.bookmark().expect("bookmark"), None);
    assert!(unspecified.specification().unwrap_err().is_unsupported_operation());
    assert!(unspecified.context().unwrap_err().is_illegal_argument());
    assert!(unspecified.pojo().is_none());
    assert_eq!(unspecified.title().expect("title"), "");
}

#[test]
fn empty_allows_abstract_specifications() {
    let (ctx, _) = context();
    let party = spec(&ctx, "crm.Party");

    let empty = ManagedObject::empty(&ctx, &party);
    assert_eq!(empty.specialization().expect("specialization"), Specialization::EMPTY);
    assert_eq!(empty.specification().expect("spec").type_name(), "crm.Party");
    assert!(empty.pojo().is_none());
    assert_eq!(empty.bookmark().expect("bookmark"), None);

    let of_none = ManagedObject::of(&ctx, &party, None).expect("of");
    assert!(of_none.specialization().expect("specialization").is_empty());
}

#[test]
fn packed_objects_unpack_to_their_runtime_specifications() {
    let (ctx, _) = context();
    let party = spec(&ctx, "crm.Party");
    let pojos = vec![
        customer("1", "Ada").into_pojo(),
        customer("2", "Grace").into_pojo(),
    ];

    let packed = ManagedObject::packed(&ctx, &party, pojos).expect("packed");
    assert!(packed.specialization().expect("specialization").is_packed());
    assert_eq!(packed.packed_pojos().expect("pojos").len(), 2);
    assert_eq!(
        packed.element_specification().expect("element").expect("spec").type_name(),
        "crm.Party"
    );
    assert_eq!(packed.bookmark().expect("bookmark"), None);

    let unpacked = packed.unpack().expect("unpack");
    let bookmarks: Vec<String> = unpacked
        .iter()
        .map(|o| o.bookmark().expect("bookmark").expect("entity").to_string())
        .collect();
    assert_eq!(bookmarks, vec!["crm.Customer:1", "crm.Customer:2"]);

    let order = DynObject::new("crm.Order").into_pojo();
    assert!(ManagedObject::packed(&ctx, &party, vec![order]).unwrap_err().is_illegal_argument());
}

#[test]
fn lazy_objects_resolve_their_specification_on_first_access() {
    let (ctx, _) = context();
    let product = DynObject::new("crm.Product").with_property("sku", "W-1").into_pojo();

    let lazy = ManagedObject::lazy(&ctx, product);
    assert_eq!(lazy.specialization().expect("specialization"), Specialization::VIEWMODEL);
    let first = lazy.specification().expect("spec");
    let second = lazy.specification().expect("spec");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.type_name(), "crm.Product");
}

#[test]
fn entities_refetch_from_the_object_manager() {
    let (ctx, objects) = context();
    let customers = spec(&ctx, "crm.Customer");
    objects
        .persist(&customers, customer("42", "Ada Lovelace").into_pojo())
        .expect("persist");
    assert_eq!(objects.entity_count(), 1);

    let stale = ManagedObject::of(&ctx, &customers, Some(customer("42", "Ada").into_pojo())).expect("of");
    assert_eq!(stale.title().expect("title"), "Ada");

    let fresh = stale.refetch().expect("refetch");
    assert_eq!(fresh.property("name"), Some(json!("Ada Lovelace")));
    assert_eq!(stale.title().expect("title"), "Ada Lovelace");

    let missing = ManagedObject::of(&ctx, &customers, Some(customer("43", "Nobody").into_pojo())).expect("of");
    assert!(missing.refetch().unwrap_err().is_illegal_argument());
}

#[test]
fn view_models_refresh_from_their_memento() {
    let (ctx, _) = context();
    let products = spec(&ctx, "crm.Product");
    let widget = DynObject::new("crm.Product").with_property("sku", "W-1").into_pojo();

    let object = ManagedObject::of(&ctx, &products, Some(widget)).expect("of");
    assert!(!object.is_bookmark_memoized());
    let bookmark = object.bookmark().expect("bookmark").expect("view model");
    assert_eq!(bookmark.logical_type_name(), "crm.Product");
    assert_eq!(bookmark.identifier(), r#"{"sku":"W-1"}"#);

    let other = Bookmark::new("crm.Product", r#"{"sku":"G-2"}"#);
    object.refresh_viewmodel(Some(other.clone())).expect("refresh");
    assert_eq!(object.pojo().expect("pojo").property("sku"), Some(json!("G-2")));
    assert_eq!(object.bookmark().expect("bookmark"), Some(other));

    assert!(object.refetch().unwrap_err().is_unsupported_operation());
}

#[test]
fn services_have_a_fixed_bookmark_and_cannot_be_refreshed() {
    let (ctx, objects) = context();
    let finder = spec(&ctx, "crm.Customers");
    let pojo = DynObject::new("crm.Customers").into_pojo();
    objects.register_service(&finder, pojo.clone());

    let service = ManagedObject::of(&ctx, &finder, Some(pojo.clone())).expect("of");
    assert_eq!(service.specialization().expect("specialization"), Specialization::SERVICE);
    assert_eq!(
        service.bookmark().expect("bookmark"),
        Some(Bookmark::new("crm.Customers", "1"))
    );
    assert_eq!(service.bookmark_refreshed().expect("bookmark"), service.bookmark().expect("bookmark"));

    // A no-op for everything that is not a view model.
    service.refresh_viewmodel(None).expect("refresh");
    assert!(Arc::ptr_eq(&service.pojo().expect("pojo"), &pojo));
    assert!(service.refetch().unwrap_err().is_unsupported_operation());
}
