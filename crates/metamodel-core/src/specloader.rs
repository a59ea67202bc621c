//! Specification loader: the per-type cache of [`ObjectSpecification`]s.
//!
//! Each type gets a slot that is filled at most once. Concurrent requests for
//! the same unloaded type serialize on the slot's load lock, so every caller
//! observes the same `Arc`. Requests for different types proceed in parallel.
//!
//! Lifecycle:
//! - [`SpecificationLoader::create_meta_model`] introspects every registered
//!   class (on the rayon pool when configured) and runs the validators,
//! - [`SpecificationLoader::dispose`] drops the cache; every later lookup is an
//!   illegal-state error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use metamodel_dsl::parse_dom_v1;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::IntrospectionConfig;
use crate::error::{MetaModelError, Result};
use crate::facets::{FacetProcessor, ProgrammingModel};
use crate::reflect::TypeRegistry;
use crate::spec::{introspect, ObjectSpecification};
use crate::validation::{
    default_validators, run_validators, MetaModelValidator, ValidationFailure, ValidationFailures,
    ValidationKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

#[derive(Default)]
struct SpecSlot {
    spec: OnceLock<Arc<ObjectSpecification>>,
    load_lock: Mutex<()>,
    loading_thread: Mutex<Option<ThreadId>>,
}

struct LoaderInner {
    registry: Arc<TypeRegistry>,
    processor: FacetProcessor,
    config: IntrospectionConfig,
    validators: Vec<Box<dyn MetaModelValidator>>,
    slots: DashMap<String, Arc<SpecSlot>>,
    by_logical_type: DashMap<String, String>,
    disposed: AtomicBool,
    fully_introspected: AtomicBool,
}

/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct SpecificationLoader {
    inner: Arc<LoaderInner>,
}

impl std::fmt::Debug for SpecificationLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecificationLoader")
            .field("types", &self.inner.registry.len())
            .field("loaded", &self.inner.slots.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl SpecificationLoader {
    pub fn new(registry: TypeRegistry, model: ProgrammingModel, config: IntrospectionConfig) -> Self {
        Self::with_validators(registry, model, config, default_validators())
    }

    /// Loader over the classes declared in `.dom` text, with the default
    /// programming model. Configured value types are added to the registry.
    pub fn from_dom(text: &str, config: IntrospectionConfig) -> Result<Self> {
        let module = parse_dom_v1(text)?;
        let registry = TypeRegistry::builder()
            .module(&module)?
            .value_types(config.value_types.iter().cloned())
            .build()?;
        tracing::debug!(
            module = %module.module_name,
            classes = registry.len(),
            "type registry built"
        );
        Ok(Self::new(registry, ProgrammingModel::default_model(), config))
    }

    pub fn with_validators(
        registry: TypeRegistry,
        model: ProgrammingModel,
        config: IntrospectionConfig,
        validators: Vec<Box<dyn MetaModelValidator>>,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                registry: Arc::new(registry),
                processor: FacetProcessor::new(model),
                config,
                validators,
                slots: DashMap::new(),
                by_logical_type: DashMap::new(),
                disposed: AtomicBool::new(false),
                fully_introspected: AtomicBool::new(false),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.inner.registry
    }

    pub fn config(&self) -> &IntrospectionConfig {
        &self.inner.config
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn is_meta_model_fully_introspected(&self) -> bool {
        self.inner.fully_introspected.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(MetaModelError::IllegalState(
                "specification loader has been disposed".to_string(),
            ));
        }
        Ok(())
    }

    fn slot(&self, type_name: &str) -> Arc<SpecSlot> {
        if let Some(slot) = self.inner.slots.get(type_name) {
            return slot.clone();
        }
        // Clone out of the map so no shard lock is held while loading.
        self.inner
            .slots
            .entry(type_name.to_string())
            .or_default()
            .clone()
    }

    /// Specification for `type_name`, introspecting it on first request.
    ///
    /// `Ok(None)` when the type is not a registered class (value types
    /// included). A failed introspection leaves the slot unloaded, so a later
    /// call tries again.
    pub fn spec_for_type(&self, type_name: &str) -> Result<Option<Arc<ObjectSpecification>>> {
        self.ensure_live()?;
        if !self.inner.registry.contains(type_name) {
            return Ok(None);
        }
        let slot = self.slot(type_name);
        if let Some(spec) = slot.spec.get() {
            return Ok(Some(spec.clone()));
        }

        let current = thread::current().id();
        if *slot.loading_thread.lock() == Some(current) {
            return Err(MetaModelError::Introspection {
                type_name: type_name.to_string(),
                message: "re-entrant load of a type that is still being introspected".to_string(),
            });
        }

        let _guard = slot.load_lock.lock();
        if let Some(spec) = slot.spec.get() {
            return Ok(Some(spec.clone()));
        }

        *slot.loading_thread.lock() = Some(current);
        let result = introspect(
            type_name,
            &self.inner.registry,
            &self.inner.processor,
            &self.inner.config,
        );
        *slot.loading_thread.lock() = None;

        match result {
            Ok(spec) => {
                self.ensure_live()?;
                let spec = slot.spec.get_or_init(|| Arc::new(spec)).clone();
                self.inner
                    .by_logical_type
                    .insert(spec.logical_type_name().to_string(), type_name.to_string());
                tracing::debug!(
                    type_name = %type_name,
                    logical_type_name = %spec.logical_type_name(),
                    "loaded specification"
                );
                Ok(Some(spec))
            }
            Err(err) => {
                tracing::warn!(type_name = %type_name, error = %err, "introspection failed");
                Err(err)
            }
        }
    }

    /// Like [`Self::spec_for_type`], but an unregistered type is an error.
    pub fn spec_for_type_or_err(&self, type_name: &str) -> Result<Arc<ObjectSpecification>> {
        self.spec_for_type(type_name)?
            .ok_or_else(|| MetaModelError::UnknownType(type_name.to_string()))
    }

    /// Lookup by logical type name. Before the metamodel is fully introspected
    /// a miss loads every remaining class and looks again.
    pub fn spec_for_logical_type_name(
        &self,
        logical_type_name: &str,
    ) -> Result<Option<Arc<ObjectSpecification>>> {
        self.ensure_live()?;
        let known = |loader: &Self| {
            loader
                .inner
                .by_logical_type
                .get(logical_type_name)
                .map(|entry| entry.value().clone())
        };
        if let Some(type_name) = known(self) {
            return self.spec_for_type(&type_name);
        }
        if self.is_meta_model_fully_introspected() {
            return Ok(None);
        }
        for type_name in self.inner.registry.type_names() {
            self.spec_for_type(type_name)?;
        }
        match known(self) {
            Some(type_name) => self.spec_for_type(&type_name),
            None => Ok(None),
        }
    }

    pub fn load_state(&self, type_name: &str) -> LoadState {
        let Some(slot) = self.inner.slots.get(type_name).map(|s| s.clone()) else {
            return LoadState::Unloaded;
        };
        if slot.spec.get().is_some() {
            LoadState::Loaded
        } else if slot.loading_thread.lock().is_some() {
            LoadState::Loading
        } else {
            LoadState::Unloaded
        }
    }

    /// Loaded specifications, ordered by type name.
    pub fn snapshot_specifications(&self) -> Vec<Arc<ObjectSpecification>> {
        let mut specs: Vec<Arc<ObjectSpecification>> = self
            .inner
            .slots
            .iter()
            .filter_map(|entry| entry.value().spec.get().cloned())
            .collect();
        specs.sort_by(|a, b| a.type_name().cmp(b.type_name()));
        specs
    }

    /// Introspects every registered class and, when configured, validates the
    /// result. Validation failures are fatal.
    pub fn create_meta_model(&self) -> Result<()> {
        self.ensure_live()?;
        let type_names: Vec<&str> = self.inner.registry.type_names().collect();
        let load = |type_name: &&str| {
            self.spec_for_type(type_name).err().map(|err| {
                ValidationFailure::new(*type_name, ValidationKind::IntrospectionFailed, err.to_string())
            })
        };
        let mut load_failures: Vec<ValidationFailure> = if self.inner.config.parallel_introspection {
            type_names.par_iter().filter_map(load).collect()
        } else {
            type_names.iter().filter_map(load).collect()
        };
        load_failures.sort_by(|a, b| a.origin.cmp(&b.origin));
        self.ensure_live()?;
        self.inner.fully_introspected.store(true, Ordering::Release);

        let mut failures = ValidationFailures::new();
        failures.extend(load_failures);
        if self.inner.config.validate_on_create {
            failures.extend(self.validate());
        }

        if !failures.is_empty() {
            tracing::warn!(failures = failures.len(), "metamodel validation failed");
            return Err(MetaModelError::Validation(failures));
        }
        tracing::info!(
            types = type_names.len(),
            policy = ?self.inner.config.policy,
            "metamodel created"
        );
        Ok(())
    }

    /// Runs the validators over the loaded specifications.
    pub fn validate(&self) -> ValidationFailures {
        run_validators(
            &self.inner.validators,
            &self.snapshot_specifications(),
            &self.inner.registry,
        )
    }

    /// Drops every cached specification. The loader is unusable afterwards.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let dropped = self.inner.slots.len();
        self.inner.slots.clear();
        self.inner.by_logical_type.clear();
        self.inner.fully_introspected.store(false, Ordering::Release);
        tracing::info!(specifications = dropped, "specification loader disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{Annotation, ClassMeta, MethodMeta, TypeRef};

    fn registry() -> TypeRegistry {
        TypeRegistry::builder()
            .class(
                ClassMeta::new("crm.Customer")
                    .annotated(Annotation::DomainObject {
                        nature: crate::reflect::Nature::Entity,
                        logical_type_name: Some("crm.Customer".to_string()),
                        introspection: crate::reflect::Introspection::AsConfigured,
                    })
                    .method(MethodMeta::new("getName").returns(TypeRef::scalar("String"))),
            )
            .class(ClassMeta::new("crm.Note").method(
                MethodMeta::new("getText").returns(TypeRef::scalar("String")),
            ))
            .build()
            .expect("registry")
    }

    fn loader() -> SpecificationLoader {
        SpecificationLoader::new(registry(), ProgrammingModel::default_model(), IntrospectionConfig::default())
    }

    #[test]
    fn loads_once_and_caches() {
        let loader = loader();
        assert_eq!(loader.load_state("crm.Customer"), LoadState::Unloaded);
        let first = loader.spec_for_type("crm.Customer").expect("load").expect("spec");
        let second = loader.spec_for_type("crm.Customer").expect("load").expect("spec");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.load_state("crm.Customer"), LoadState::Loaded);
    }

    #[test]
    fn unregistered_and_value_types_have_no_spec() {
        let loader = loader();
        assert!(loader.spec_for_type("String").expect("lookup").is_none());
        assert!(loader.spec_for_type("crm.Missing").expect("lookup").is_none());
        let err = loader.spec_for_type_or_err("crm.Missing").unwrap_err();
        assert!(matches!(err, MetaModelError::UnknownType(_)));
    }

    #[test]
    fn logical_type_name_lookup_loads_on_demand() {
        let loader = loader();
        let spec = loader
            .spec_for_logical_type_name("crm.Customer")
            .expect("lookup")
            .expect("spec");
        assert_eq!(spec.type_name(), "crm.Customer");
        assert!(loader.spec_for_logical_type_name("nope").expect("lookup").is_none());
    }

    #[test]
    fn create_meta_model_loads_everything() {
        let loader = loader();
        loader.create_meta_model().expect("create");
        assert!(loader.is_meta_model_fully_introspected());
        let names: Vec<String> = loader
            .snapshot_specifications()
            .iter()
            .map(|s| s.type_name().to_string())
            .collect();
        assert_eq!(names, vec!["crm.Customer", "crm.Note"]);
    }

    #[test]
    fn dispose_rejects_later_lookups() {
        let loader = loader();
        loader.spec_for_type("crm.Customer").expect("load");
        loader.dispose();
        assert!(loader.is_disposed());
        assert!(loader.snapshot_specifications().is_empty());
        let err = loader.spec_for_type("crm.Customer").unwrap_err();
        assert!(matches!(err, MetaModelError::IllegalState(_)));
        assert!(loader.create_meta_model().is_err());
    }
}
