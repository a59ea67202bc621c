use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{MetaModelError, Result};
use crate::spec::{BeanSort, ObjectSpecification};
use crate::specloader::SpecificationLoader;

use super::{Bookmark, DomainObject, DynObject, Pojo};

/// Identifier of the single instance of a service.
pub const SERVICE_IDENTIFIER: &str = "1";

/// Issues bookmarks and recreates objects from them.
pub trait ObjectManager: Send + Sync {
    fn bookmark_of(&self, spec: &ObjectSpecification, pojo: &dyn DomainObject) -> Result<Bookmark>;

    fn refetch(&self, spec: &ObjectSpecification, bookmark: &Bookmark) -> Result<Pojo>;
}

/// [`ObjectManager`] over an in-process store.
///
/// - entities are looked up by their object id,
/// - view models and values carry their JSON state as identifier,
/// - services are registered once and share [`SERVICE_IDENTIFIER`].
#[derive(Debug, Default)]
pub struct InMemoryObjectManager {
    entities: DashMap<Bookmark, Pojo>,
    services: DashMap<String, Pojo>,
}

impl InMemoryObjectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an entity under its object id and returns its bookmark.
    pub fn persist(&self, spec: &ObjectSpecification, pojo: Pojo) -> Result<Bookmark> {
        if !spec.is_entity() {
            return Err(MetaModelError::illegal_argument(format!(
                "`{}` is not an entity",
                spec.type_name()
            )));
        }
        let bookmark = self.bookmark_of(spec, pojo.as_ref())?;
        self.entities.insert(bookmark.clone(), pojo);
        tracing::trace!(bookmark = %bookmark, "entity persisted");
        Ok(bookmark)
    }

    pub fn register_service(&self, spec: &ObjectSpecification, pojo: Pojo) {
        self.services.insert(spec.logical_type_name().to_string(), pojo);
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

impl ObjectManager for InMemoryObjectManager {
    fn bookmark_of(&self, spec: &ObjectSpecification, pojo: &dyn DomainObject) -> Result<Bookmark> {
        let ltn = spec.logical_type_name();
        match spec.sort() {
            BeanSort::Entity => pojo.object_id().map(|id| Bookmark::new(ltn, id)).ok_or_else(|| {
                MetaModelError::IllegalState(format!(
                    "entity of type `{}` has no id; it is not persistent",
                    spec.type_name()
                ))
            }),
            BeanSort::ViewModel | BeanSort::Value => {
                let memento = serde_json::to_string(&pojo.state())
                    .map_err(|e| MetaModelError::illegal_argument(e.to_string()))?;
                Ok(Bookmark::new(ltn, memento))
            }
            BeanSort::Service => Ok(Bookmark::new(ltn, SERVICE_IDENTIFIER)),
            sort => Err(MetaModelError::unsupported(format!(
                "objects of sort {sort} cannot be bookmarked"
            ))),
        }
    }

    fn refetch(&self, spec: &ObjectSpecification, bookmark: &Bookmark) -> Result<Pojo> {
        if bookmark.logical_type_name() != spec.logical_type_name() {
            return Err(MetaModelError::illegal_argument(format!(
                "bookmark {bookmark} does not belong to `{}`",
                spec.type_name()
            )));
        }
        match spec.sort() {
            BeanSort::Entity => self
                .entities
                .get(bookmark)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| MetaModelError::illegal_argument(format!("no entity for {bookmark}"))),
            BeanSort::ViewModel | BeanSort::Value => {
                let state = serde_json::from_str(bookmark.identifier())
                    .map_err(|e| MetaModelError::illegal_argument(format!("{bookmark}: {e}")))?;
                Ok(DynObject::from_state(spec.type_name(), state)?.into_pojo())
            }
            BeanSort::Service => self
                .services
                .get(spec.logical_type_name())
                .map(|entry| entry.value().clone())
                .ok_or_else(|| {
                    MetaModelError::IllegalState(format!(
                        "service `{}` is not registered",
                        spec.type_name()
                    ))
                }),
            sort => Err(MetaModelError::unsupported(format!(
                "objects of sort {sort} cannot be refetched"
            ))),
        }
    }
}

/// Cheap-clone handle on the collaborators a managed object needs.
#[derive(Clone)]
pub struct MetaModelContext {
    loader: SpecificationLoader,
    objects: Arc<dyn ObjectManager>,
}

impl std::fmt::Debug for MetaModelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaModelContext")
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

impl MetaModelContext {
    pub fn new(loader: SpecificationLoader, objects: Arc<dyn ObjectManager>) -> Self {
        Self { loader, objects }
    }

    pub fn in_memory(loader: SpecificationLoader) -> (Self, Arc<InMemoryObjectManager>) {
        let objects = Arc::new(InMemoryObjectManager::new());
        (Self::new(loader, objects.clone()), objects)
    }

    pub fn loader(&self) -> &SpecificationLoader {
        &self.loader
    }

    pub fn objects(&self) -> &Arc<dyn ObjectManager> {
        &self.objects
    }
}
