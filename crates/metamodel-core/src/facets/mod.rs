//! Facet factories and the programming model that orders them.
//!
//! Each factory inspects a class, a member method or an action parameter and
//! contributes zero or more facets to the feature's [`FacetHolder`]. Factories
//! run in the fixed order of [`ProgrammingModel::default_model`]; later
//! contributions only override earlier ones through the holder's replacement
//! rule, so defaults are registered first and explicit annotations last.
//!
//! Factories never fail. A factory that cannot apply contributes nothing; a
//! factory that sees a conflicting candidate leaves it unconsumed so that
//! metamodel validation reports it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::IntrospectionPolicy;
use crate::facetapi::{FacetHolder, FeatureType, FeatureTypes};
use crate::methods::{MethodFinder, MethodFinderOptions, MethodRemover};
use crate::reflect::{Annotation, AnnotationKind, ClassMeta, MethodMeta, ParamMeta, TypeRegistry};

pub mod common;
pub mod members;
pub mod object;
pub mod support;

// ============================================================================
// Contexts
// ============================================================================

/// What every processing context shares: the class under introspection and
/// the methods visible on it.
#[derive(Clone, Copy)]
pub struct IntrospectionScope<'a> {
    pub class: &'a ClassMeta,
    pub registry: &'a TypeRegistry,
    pub policy: IntrospectionPolicy,
    /// Declared and inherited methods of `class`.
    pub methods: &'a [Arc<MethodMeta>],
}

impl<'a> IntrospectionScope<'a> {
    /// A class annotation, inherited along the superclass chain.
    pub fn class_annotation(&self, kind: AnnotationKind) -> Option<&'a Annotation> {
        self.registry.synthesize_on_type(&self.class.name, kind)
    }
}

pub struct ProcessClassContext<'a> {
    pub scope: IntrospectionScope<'a>,
    pub holder: &'a mut FacetHolder,
    pub remover: &'a mut MethodRemover,
}

impl<'a> ProcessClassContext<'a> {
    pub fn class(&self) -> &'a ClassMeta {
        self.scope.class
    }

    pub fn policy(&self) -> IntrospectionPolicy {
        self.scope.policy
    }

    pub fn find_methods(&self, options: &MethodFinderOptions) -> Vec<Arc<MethodMeta>> {
        MethodFinder::find_methods(self.scope.methods, self.scope.registry, &*self.remover, options)
    }

    pub fn find_single(&self, options: &MethodFinderOptions) -> Option<Arc<MethodMeta>> {
        MethodFinder::find_single(self.scope.methods, self.scope.registry, &*self.remover, options)
    }

    pub fn remove_method(&mut self, method: &MethodMeta) {
        self.remover.remove_method(method);
    }
}

pub struct ProcessMethodContext<'a> {
    pub scope: IntrospectionScope<'a>,
    pub feature_type: FeatureType,
    pub member_id: &'a str,
    pub method: &'a Arc<MethodMeta>,
    pub holder: &'a mut FacetHolder,
    pub remover: &'a mut MethodRemover,
}

impl<'a> ProcessMethodContext<'a> {
    pub fn policy(&self) -> IntrospectionPolicy {
        self.scope.policy
    }

    /// Own annotation of the member method.
    pub fn annotation(&self, kind: AnnotationKind) -> Option<&'a Annotation> {
        self.scope.registry.synthesize_on_method(self.method, kind)
    }

    pub fn find_single(&self, options: &MethodFinderOptions) -> Option<Arc<MethodMeta>> {
        MethodFinder::find_single(self.scope.methods, self.scope.registry, &*self.remover, options)
    }

    pub fn remove_method(&mut self, method: &MethodMeta) {
        self.remover.remove_method(method);
    }
}

pub struct ProcessParameterContext<'a> {
    pub scope: IntrospectionScope<'a>,
    pub action_id: &'a str,
    pub method: &'a Arc<MethodMeta>,
    pub index: usize,
    pub param: &'a ParamMeta,
    pub holder: &'a mut FacetHolder,
    pub remover: &'a mut MethodRemover,
}

impl<'a> ProcessParameterContext<'a> {
    pub fn policy(&self) -> IntrospectionPolicy {
        self.scope.policy
    }

    pub fn annotation(&self, kind: AnnotationKind) -> Option<&'a Annotation> {
        self.param.annotation(kind)
    }

    pub fn find_single(&self, options: &MethodFinderOptions) -> Option<Arc<MethodMeta>> {
        MethodFinder::find_single(self.scope.methods, self.scope.registry, &*self.remover, options)
    }

    pub fn remove_method(&mut self, method: &MethodMeta) {
        self.remover.remove_method(method);
    }
}

// ============================================================================
// Factory contract
// ============================================================================

pub trait FacetFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn feature_types(&self) -> FeatureTypes;

    fn process_class(&self, _ctx: &mut ProcessClassContext<'_>) {}

    fn process_method(&self, _ctx: &mut ProcessMethodContext<'_>) {}

    fn process_param(&self, _ctx: &mut ProcessParameterContext<'_>) {}
}

/// The ordered list of factories applied to every class.
pub struct ProgrammingModel {
    factories: Vec<Box<dyn FacetFactory>>,
}

impl ProgrammingModel {
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    pub fn default_model() -> Self {
        use members::*;
        use object::*;
        use support::*;

        let mut model = Self::empty();
        model
            .add_factory(ObjectNatureFacetFactory)
            .add_factory(PersistenceCapableFacetFactory)
            .add_factory(DomainObjectAnnotationFacetFactory)
            .add_factory(common::NamedFacetDefaultFactory)
            .add_factory(common::MandatoryFacetDefaultFactory)
            .add_factory(PropertyAccessorFacetFactory)
            .add_factory(CollectionAccessorFacetFactory)
            .add_factory(ActionInvocationFacetFactory)
            .add_factory(TitleFacetFactory)
            .add_factory(IconFacetFactory)
            .add_factory(CssClassFacetFactory)
            .add_factory(LifecycleCallbackFacetFactory)
            .add_factory(PropertyAnnotationFacetFactory)
            .add_factory(CollectionAnnotationFacetFactory)
            .add_factory(ActionAnnotationFacetFactory)
            .add_factory(ParameterAnnotationFacetFactory)
            .add_factory(DigitsFacetFactory)
            .add_factory(common::LayoutFacetFactory);
        for kind in SupportKind::ALL {
            model.add_factory(MemberSupportFacetFactory::new(kind));
        }
        model
    }

    pub fn add_factory(&mut self, factory: impl FacetFactory + 'static) -> &mut Self {
        self.factories.push(Box::new(factory));
        self
    }

    pub fn factories(&self) -> &[Box<dyn FacetFactory>] {
        &self.factories
    }

    pub fn factory_names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.name()).collect()
    }
}

impl Default for ProgrammingModel {
    fn default() -> Self {
        Self::default_model()
    }
}

/// Runs a [`ProgrammingModel`] with factory lists cached per feature type.
pub struct FacetProcessor {
    model: ProgrammingModel,
    by_feature: HashMap<FeatureType, Vec<usize>>,
}

impl FacetProcessor {
    pub fn new(model: ProgrammingModel) -> Self {
        let by_feature = FeatureType::ALL
            .into_iter()
            .map(|ft| {
                let indices = model
                    .factories
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| f.feature_types().contains(ft))
                    .map(|(i, _)| i)
                    .collect();
                (ft, indices)
            })
            .collect();
        Self { model, by_feature }
    }

    pub fn model(&self) -> &ProgrammingModel {
        &self.model
    }

    fn factories_for(&self, feature_type: FeatureType) -> impl Iterator<Item = &dyn FacetFactory> {
        self.by_feature
            .get(&feature_type)
            .into_iter()
            .flatten()
            .map(move |i| self.model.factories[*i].as_ref())
    }

    pub fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        for factory in self.factories_for(FeatureType::Object) {
            factory.process_class(ctx);
        }
    }

    pub fn process_member(&self, ctx: &mut ProcessMethodContext<'_>) {
        for factory in self.factories_for(ctx.feature_type) {
            factory.process_method(ctx);
        }
    }

    pub fn process_param(&self, ctx: &mut ProcessParameterContext<'_>) {
        for factory in self.factories_for(FeatureType::ActionParameter) {
            factory.process_param(ctx);
        }
    }
}

impl Default for FacetProcessor {
    fn default() -> Self {
        Self::new(ProgrammingModel::default_model())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_orders_defaults_before_annotations() {
        let names = ProgrammingModel::default_model().factory_names();
        let pos = |n: &str| names.iter().position(|x| *x == n).expect(n);
        assert!(pos("ObjectNatureFacetFactory") < pos("PersistenceCapableFacetFactory"));
        assert!(pos("PersistenceCapableFacetFactory") < pos("DomainObjectAnnotationFacetFactory"));
        assert!(pos("NamedFacetDefaultFactory") < pos("LayoutFacetFactory"));
        assert!(pos("MandatoryFacetDefaultFactory") < pos("PropertyAnnotationFacetFactory"));
        assert!(pos("LayoutFacetFactory") < pos("HideFacetFactory"));
    }

    #[test]
    fn processor_caches_factories_per_feature_type() {
        let processor = FacetProcessor::default();
        let object: Vec<&str> = processor
            .factories_for(FeatureType::Object)
            .map(|f| f.name())
            .collect();
        assert!(object.contains(&"TitleFacetFactory"));
        assert!(!object.contains(&"PropertyAccessorFacetFactory"));
        let params: Vec<&str> = processor
            .factories_for(FeatureType::ActionParameter)
            .map(|f| f.name())
            .collect();
        assert!(params.contains(&"ParameterAnnotationFacetFactory"));
        assert!(params.contains(&"ChoicesFacetFactory"));
    }
}
