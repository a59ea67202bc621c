use std::any::Any;
use std::sync::Arc;

use metamodel_core::config::IntrospectionPolicy;
use metamodel_core::facetapi::{FacetType, FeatureTypes};
use metamodel_core::facets::support::{DisableForContextFacet, HideForContextFacet};
use metamodel_core::facets::{FacetFactory, ProcessClassContext};
use metamodel_core::methods::{MethodFinder, MethodFinderOptions, MethodRemover};
use metamodel_core::reflect::{Annotation, ClassMeta, MethodMeta, TypeRef};
use metamodel_core::{
    Facet, FacetAttributes, HasFacetHolder, IntrospectionConfig, ObjectFeature, ProgrammingModel,
    SpecificationLoader, TypeRegistry,
};

const FORM: &str = r#"
module Forms

@DomainObject(nature = VIEW_MODEL, logicalTypeName = "f.Form", introspection = ANNOTATION_REQUIRED)
class f.Form:
  @Property
  public getName() -> String
  public getExtra() -> String
  private hideName() -> boolean
  @MemberSupport
  private disableName() -> String
  @Action
  public submit()
"#;

#[test]
fn required_policy_ignores_unannotated_private_support_method() {
    let loader = SpecificationLoader::from_dom(FORM, IntrospectionConfig::default()).expect("loader");
    let form = loader.spec_for_type_or_err("f.Form").expect("spec");
    assert_eq!(form.policy(), IntrospectionPolicy::AnnotationRequired);

    let members: Vec<String> = form.members().iter().map(|m| m.id().to_string()).collect();
    assert_eq!(members, vec!["name", "submit"]);

    let name = form.property("name").expect("name");
    assert!(!name.contains_facet::<HideForContextFacet>());
    assert!(name.contains_facet::<DisableForContextFacet>());

    loader.create_meta_model().expect("no failures");
}

#[test]
fn finder_with_required_policy_skips_unannotated_private_candidate() {
    let methods: Vec<Arc<MethodMeta>> = vec![Arc::new(
        MethodMeta::new("hideName")
            .returns(TypeRef::scalar("boolean"))
            .private(),
    )];
    let remover = MethodRemover::new();
    let registry = TypeRegistry::builder().build().expect("registry");

    let required = MethodFinderOptions::member_support(["hideName"], IntrospectionPolicy::AnnotationRequired);
    assert!(MethodFinder::find_methods(&methods, &registry, &remover, &required).is_empty());

    let annotated: Vec<Arc<MethodMeta>> = vec![Arc::new(
        MethodMeta::new("hideName")
            .returns(TypeRef::scalar("boolean"))
            .private()
            .annotated(Annotation::MemberSupport),
    )];
    assert_eq!(MethodFinder::find_methods(&annotated, &registry, &remover, &required).len(), 1);
}

const OVERRIDES: &str = r#"
module Overrides

@DomainObject(nature = VIEW_MODEL, logicalTypeName = "o.Base", introspection = ANNOTATION_REQUIRED)
class o.Base:
  @Property
  public getName() -> String
  @Action
  public go()
  @MemberSupport
  private hideGo() -> boolean

@DomainObject(nature = VIEW_MODEL, logicalTypeName = "o.Sub", introspection = ANNOTATION_REQUIRED)
class o.Sub extends o.Base:
  public getName() -> String
  public go()
  private hideGo() -> boolean
"#;

#[test]
fn overrides_keep_member_annotations_of_concrete_superclass_methods() {
    let loader = SpecificationLoader::from_dom(OVERRIDES, IntrospectionConfig::default()).expect("loader");
    let member_ids = |type_name: &str| -> Vec<String> {
        let spec = loader.spec_for_type_or_err(type_name).expect("spec");
        spec.members().iter().map(|m| m.id().to_string()).collect()
    };
    assert_eq!(member_ids("o.Base"), vec!["name", "go"]);
    assert_eq!(member_ids("o.Sub"), vec!["name", "go"]);

    let sub = loader.spec_for_type_or_err("o.Sub").expect("spec");
    let go = sub.action("go").expect("go");
    assert_eq!(go.method().declaring_type, "o.Sub");
    assert!(go.contains_facet::<HideForContextFacet>());
    assert!(sub.unconsumed_methods().is_empty());

    loader.create_meta_model().expect("no failures");
}

// ============================================================================
// Factory ordering
// ============================================================================

#[derive(Debug)]
struct Badge {
    label: &'static str,
    attributes: FacetAttributes,
}

impl Facet for Badge {
    fn attributes(&self) -> FacetAttributes {
        self.attributes
    }

    fn facet_type(&self) -> FacetType {
        FacetType::of::<Self>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct BadgeFactory {
    name: &'static str,
    attributes: FacetAttributes,
}

impl FacetFactory for BadgeFactory {
    fn name(&self) -> &'static str {
        self.name
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::OBJECTS_ONLY
    }

    fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        ctx.holder.add_facet(Badge {
            label: self.name,
            attributes: self.attributes,
        });
    }
}

fn badge_after(a: FacetAttributes, b: FacetAttributes) -> &'static str {
    let registry = TypeRegistry::builder()
        .class(ClassMeta::new("t.Thing"))
        .build()
        .expect("registry");
    let mut model = ProgrammingModel::empty();
    model
        .add_factory(BadgeFactory {
            name: "A",
            attributes: a,
        })
        .add_factory(BadgeFactory {
            name: "B",
            attributes: b,
        });
    let loader = SpecificationLoader::new(registry, model, IntrospectionConfig::default());
    let spec = loader.spec_for_type_or_err("t.Thing").expect("spec");
    spec.facet::<Badge>().expect("badge").label
}

#[test]
fn later_factory_wins_only_when_replacing_or_replacing_a_noop() {
    let plain = FacetAttributes::DEFAULT;
    assert_eq!(badge_after(plain, plain), "A");
    assert_eq!(badge_after(plain, plain.derived()), "A");
    assert_eq!(badge_after(plain, plain.always_replace()), "B");
    assert_eq!(badge_after(plain.noop(), plain), "B");
    assert_eq!(badge_after(plain.noop().derived(), plain.derived()), "B");
}
