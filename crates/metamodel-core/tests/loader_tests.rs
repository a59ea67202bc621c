use std::sync::{Arc, Barrier};
use std::thread;

use metamodel_core::{
    IntrospectionConfig, LoadState, MetaModelError, SpecificationLoader, ValidationKind,
};

const CRM: &str = include_str!("fixtures/crm.dom");

const BROKEN: &str = r#"
module Broken

@DomainObject(nature = ENTITY, logicalTypeName = "x.Thing")
class x.A:
  public getName() -> String
  public hideNothing() -> boolean
  @MemberSupport
  @Action
  public disableName() -> String
  public getWidget() -> x.Widget

@DomainObject(nature = ENTITY, logicalTypeName = "x.Thing")
class x.B:
  public getId() -> long
  @Property
  public id() -> long

@DomainObject(nature = VIEW_MODEL, logicalTypeName = "x.C")
class x.C:
  @Collection
  public getItems() -> String
"#;

#[test]
fn concurrent_loads_of_one_class_share_the_instance() {
    let loader = SpecificationLoader::from_dom(CRM, IntrospectionConfig::default()).expect("loader");
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let specs: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let loader = loader.clone();
                let barrier = barrier.clone();
                scope.spawn(move || {
                    barrier.wait();
                    loader
                        .spec_for_type("crm.Customer")
                        .expect("load")
                        .expect("spec")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect()
    });

    let first = &specs[0];
    assert!(specs.iter().all(|s| Arc::ptr_eq(s, first)));
    assert_eq!(loader.load_state("crm.Customer"), LoadState::Loaded);
}

#[test]
fn parallel_and_sequential_creation_agree() {
    let parallel = SpecificationLoader::from_dom(CRM, IntrospectionConfig::default()).expect("loader");
    let sequential = SpecificationLoader::from_dom(
        CRM,
        IntrospectionConfig {
            parallel_introspection: false,
            ..IntrospectionConfig::default()
        },
    )
    .expect("loader");
    parallel.create_meta_model().expect("parallel");
    sequential.create_meta_model().expect("sequential");

    let describe = |loader: &SpecificationLoader| -> Vec<(String, usize)> {
        loader
            .snapshot_specifications()
            .iter()
            .map(|s| (s.type_name().to_string(), s.members().len()))
            .collect()
    };
    assert_eq!(describe(&parallel), describe(&sequential));
}

#[test]
fn failed_introspection_is_isolated_to_its_class() {
    let loader = SpecificationLoader::from_dom(BROKEN, IntrospectionConfig::default()).expect("loader");

    let err = loader.spec_for_type("x.C").unwrap_err();
    assert!(matches!(err, MetaModelError::Introspection { ref type_name, .. } if type_name == "x.C"));
    assert_eq!(loader.load_state("x.C"), LoadState::Unloaded);

    let a = loader.spec_for_type("x.A").expect("load").expect("spec");
    assert_eq!(a.type_name(), "x.A");
    assert!(loader.spec_for_type("x.C").is_err());
}

#[test]
fn validation_collects_every_failure() {
    let loader = SpecificationLoader::from_dom(BROKEN, IntrospectionConfig::default()).expect("loader");

    let err = loader.create_meta_model().unwrap_err();
    let MetaModelError::Validation(failures) = err else {
        panic!("expected validation failure, got {err}");
    };

    let kinds = |kind| failures.of_kind(kind).map(|f| f.origin.clone()).collect::<Vec<_>>();
    assert_eq!(kinds(ValidationKind::IntrospectionFailed), vec!["x.C"]);
    assert_eq!(kinds(ValidationKind::ConflictingAnnotations), vec!["x.A#disableName()"]);
    assert_eq!(kinds(ValidationKind::OrphanedSupportMethod), vec!["x.A#hideNothing()"]);
    assert_eq!(kinds(ValidationKind::UnknownMemberType), vec!["x.A#widget"]);
    assert_eq!(kinds(ValidationKind::DuplicateMemberId), vec!["x.B#id"]);
    assert_eq!(kinds(ValidationKind::DuplicateLogicalTypeName), vec!["x.Thing"]);

    let report = failures.to_string();
    assert!(report.contains("[orphaned-support-method] x.A#hideNothing()"));
}

#[test]
fn validation_can_be_deferred() {
    let config = IntrospectionConfig {
        validate_on_create: false,
        ..IntrospectionConfig::default()
    };
    let loader = SpecificationLoader::from_dom(BROKEN, config).expect("loader");
    // Introspection failures are still reported.
    let err = loader.create_meta_model().unwrap_err();
    let MetaModelError::Validation(failures) = err else {
        panic!("expected validation failure, got {err}");
    };
    assert_eq!(failures.len(), 1);
    assert!(!loader.validate().is_empty());
}

#[test]
fn disposed_loader_refuses_lookups() {
    let loader = SpecificationLoader::from_dom(CRM, IntrospectionConfig::default()).expect("loader");
    loader.create_meta_model().expect("create");
    let kept = loader.spec_for_type_or_err("crm.Order").expect("spec");

    loader.dispose();
    assert!(!loader.is_meta_model_fully_introspected());
    assert!(matches!(
        loader.spec_for_type("crm.Order").unwrap_err(),
        MetaModelError::IllegalState(_)
    ));
    assert!(loader.spec_for_logical_type_name("crm.Order").is_err());
    // Specifications already handed out stay usable.
    assert_eq!(kept.type_name(), "crm.Order");
}
