//! Integration tests for the complete metamodel pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - `.dom` parsing → TypeRegistry → SpecificationLoader
//! - TOML configuration → introspection policy and value types
//! - Specifications → ManagedObject bookmarks and titles
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;
use tempfile::tempdir;

use metamodel_core::{
    Bookmark, DynObject, IntrospectionConfig, ManagedObject, MetaModelContext, MetaModelError,
    ProgrammingModel, SpecificationLoader, TypeRegistry, ValidationKind,
};
use metamodel_dsl::parse_dom_v1;

const LIBRARY: &str = r#"
module Library

@DomainObject(nature = ENTITY, logicalTypeName = "lib.Book")
class lib.Book:
  @Title
  public getTitle() -> String
  public getPrice() -> Money
  public getAuthor() -> lib.Author
  @Action(semantics = SAFE)
  public similar() -> List<lib.Book>

@DomainObject(nature = ENTITY, logicalTypeName = "lib.Author")
class lib.Author:
  public getName() -> String
  public getBooks() -> List<lib.Book>
"#;

// ============================================================================
// `.dom` parsing → registry → loader
// ============================================================================

#[test]
fn test_dom_v1_module_builds_a_registry() {
    let module = parse_dom_v1(LIBRARY).expect("should parse");
    assert_eq!(module.module_name, "Library");
    assert_eq!(module.classes.len(), 2);

    let registry = TypeRegistry::builder()
        .module(&module)
        .expect("module")
        .value_type("Money")
        .build()
        .expect("registry");
    assert!(registry.contains("lib.Book"));
    assert!(registry.is_known_type("Money"));
    assert!(!registry.is_known_type("Euro"));

    let loader = SpecificationLoader::new(
        registry,
        ProgrammingModel::default_model(),
        IntrospectionConfig::default(),
    );
    loader.create_meta_model().expect("create metamodel");
    let book = loader
        .spec_for_logical_type_name("lib.Book")
        .expect("lookup")
        .expect("book");
    assert_eq!(book.type_name(), "lib.Book");
}

#[test]
fn test_parse_errors_surface_through_the_loader() {
    let err = SpecificationLoader::from_dom("public getX() -> String", IntrospectionConfig::default())
        .unwrap_err();
    assert!(matches!(err, MetaModelError::Parse(_)));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_unknown_value_type_fails_validation_until_configured() {
    let err = SpecificationLoader::from_dom(LIBRARY, IntrospectionConfig::default())
        .expect("loader")
        .create_meta_model()
        .unwrap_err();
    let MetaModelError::Validation(failures) = err else {
        panic!("expected validation failure, got {err}");
    };
    let unknown: Vec<&str> = failures
        .of_kind(ValidationKind::UnknownMemberType)
        .map(|f| f.origin.as_str())
        .collect();
    assert_eq!(unknown, vec!["lib.Book#price"]);

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("introspection.toml");
    std::fs::write(&path, "value-types = [\"Money\"]\nparallel-introspection = false\n")
        .expect("write config");
    let config = IntrospectionConfig::load(&path).expect("config");
    assert!(!config.parallel_introspection);

    let loader = SpecificationLoader::from_dom(LIBRARY, config).expect("loader");
    loader.create_meta_model().expect("configured value type");
    assert!(loader.validate().is_empty());
}

// ============================================================================
// Managed objects
// ============================================================================

fn library() -> (MetaModelContext, Arc<metamodel_core::object::InMemoryObjectManager>) {
    let config = IntrospectionConfig {
        value_types: vec!["Money".to_string()],
        ..IntrospectionConfig::default()
    };
    let loader = SpecificationLoader::from_dom(LIBRARY, config).expect("loader");
    loader.create_meta_model().expect("create metamodel");
    MetaModelContext::in_memory(loader)
}

#[test]
fn test_persisted_entity_round_trips_through_its_bookmark() {
    let (ctx, objects) = library();
    let books = ctx.loader().spec_for_type_or_err("lib.Book").expect("spec");

    let dune = DynObject::new("lib.Book")
        .with_id("isbn-1")
        .with_property("title", "Dune")
        .into_pojo();
    let bookmark = objects.persist(&books, dune).expect("persist");
    assert_eq!(bookmark.to_string(), "lib.Book:isbn-1");

    let parsed: Bookmark = "lib.Book:isbn-1".parse().expect("bookmark");
    let spec = ctx
        .loader()
        .spec_for_logical_type_name(parsed.logical_type_name())
        .expect("lookup")
        .expect("spec");
    let pojo = ctx.objects().refetch(&spec, &parsed).expect("refetch");
    assert_eq!(pojo.property("title"), Some(serde_json::json!("Dune")));

    let managed = ManagedObject::bookmarked(&ctx, &spec, pojo, parsed.clone()).expect("managed");
    assert!(managed.is_bookmark_memoized());
    assert_eq!(managed.bookmark().expect("bookmark"), Some(parsed));
    assert_eq!(managed.title().expect("title"), "Dune");
}

#[test]
fn test_cross_references_resolve_in_both_directions() {
    let (ctx, _) = library();
    let loader = ctx.loader();
    let book = loader.spec_for_type_or_err("lib.Book").expect("book");
    let author = book
        .property("author")
        .expect("author property")
        .specification(loader)
        .expect("load")
        .expect("author spec");
    let books = author
        .collection("books")
        .expect("books collection")
        .element_specification(loader)
        .expect("load")
        .expect("book spec");
    assert!(Arc::ptr_eq(&book, &books));

    let similar = book.action("similar").expect("similar");
    assert!(similar.semantics().is_safe());
}
