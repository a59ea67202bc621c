use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::error::{MetaModelError, Result};
use crate::spec::ObjectSpecification;

use super::{Bookmark, MetaModelContext, Pojo, Specialization};

enum SpecSlot {
    None,
    Eager(Arc<ObjectSpecification>),
    /// Resolved from the pojo's type on first access.
    Lazy(OnceLock<Arc<ObjectSpecification>>),
}

enum PojoSlot {
    None,
    Fixed(Pojo),
    /// Stateful and refetchable pojos can be swapped for a fresh instance.
    Swappable(RwLock<Pojo>),
    Packed(Vec<Pojo>),
}

/// A domain instance paired with its specification and identity policy.
///
/// The [`Specialization`] is fixed at construction (for [`ManagedObject::lazy`]
/// on first access) and decides which operations are legal.
pub struct ManagedObject {
    specialization: OnceLock<Specialization>,
    context: Option<MetaModelContext>,
    spec: SpecSlot,
    pojo: PojoSlot,
    bookmark: RwLock<Option<Bookmark>>,
}

impl fmt::Debug for ManagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spec = match &self.spec {
            SpecSlot::None => None,
            SpecSlot::Eager(spec) => Some(spec.type_name()),
            SpecSlot::Lazy(cell) => cell.get().map(|s| s.type_name()),
        };
        f.debug_struct("ManagedObject")
            .field("specialization", &self.specialization.get())
            .field("spec", &spec)
            .field("bookmark", &*self.bookmark.read())
            .finish_non_exhaustive()
    }
}

fn pojo_slot(specialization: Specialization, pojo: Pojo) -> PojoSlot {
    let policy = specialization.pojo_policy();
    if policy.is_stateful() || policy.is_refetchable() {
        PojoSlot::Swappable(RwLock::new(pojo))
    } else {
        PojoSlot::Fixed(pojo)
    }
}

fn fixed(specialization: Specialization) -> OnceLock<Specialization> {
    let cell = OnceLock::new();
    let _ = cell.set(specialization);
    cell
}

/// Specification the pojo is actually an instance of: `spec` itself, or the
/// registered subclass when the pojo's runtime type is more specific.
fn actual_spec(
    ctx: &MetaModelContext,
    spec: &Arc<ObjectSpecification>,
    pojo: &Pojo,
) -> Result<Arc<ObjectSpecification>> {
    let runtime_type = pojo.type_name();
    if runtime_type == spec.type_name() {
        return Ok(spec.clone());
    }
    if !spec.is_assignable_from(runtime_type) {
        return Err(MetaModelError::illegal_argument(format!(
            "pojo not compatible with specification: spec = `{}`, pojo type = `{runtime_type}`",
            spec.type_name()
        )));
    }
    ctx.loader().spec_for_type_or_err(runtime_type)
}

impl ManagedObject {
    fn specified(
        ctx: &MetaModelContext,
        spec: Arc<ObjectSpecification>,
        pojo: Pojo,
        bookmark: Option<Bookmark>,
    ) -> Result<Self> {
        let specialization = Specialization::for_sort(spec.sort())?;
        Ok(Self {
            specialization: fixed(specialization),
            context: Some(ctx.clone()),
            spec: SpecSlot::Eager(spec),
            pojo: pojo_slot(specialization, pojo),
            bookmark: RwLock::new(bookmark),
        })
    }

    // ------------------------------------------------------------------------
    // Factories
    // ------------------------------------------------------------------------

    /// Eager specification and pojo, no bookmark memoized.
    pub fn not_bookmarked(
        ctx: &MetaModelContext,
        spec: &Arc<ObjectSpecification>,
        pojo: Pojo,
    ) -> Result<Self> {
        let spec = actual_spec(ctx, spec, &pojo)?;
        Self::specified(ctx, spec, pojo, None)
    }

    /// Eager specification and pojo; entities get their bookmark memoized
    /// right away when they have one. No pojo yields an [`Self::empty`].
    pub fn of(
        ctx: &MetaModelContext,
        spec: &Arc<ObjectSpecification>,
        pojo: Option<Pojo>,
    ) -> Result<Self> {
        let Some(pojo) = pojo else {
            return Ok(Self::empty(ctx, spec));
        };
        let object = Self::not_bookmarked(ctx, spec, pojo)?;
        if object.specialization()?.is_entity() {
            if let Err(err) = object.bookmark() {
                tracing::debug!(
                    type_name = %spec.type_name(),
                    error = %err,
                    "entity not bookmarked on creation"
                );
            }
        }
        Ok(object)
    }

    /// Eager specification, pojo and a known bookmark.
    pub fn bookmarked(
        ctx: &MetaModelContext,
        spec: &Arc<ObjectSpecification>,
        pojo: Pojo,
        bookmark: Bookmark,
    ) -> Result<Self> {
        let spec = actual_spec(ctx, spec, &pojo)?;
        if bookmark.logical_type_name() != spec.logical_type_name() {
            return Err(MetaModelError::illegal_argument(format!(
                "bookmark {bookmark} does not belong to `{}`",
                spec.type_name()
            )));
        }
        let specialization = Specialization::for_sort(spec.sort())?;
        let bookmark = (!specialization.bookmark_policy().is_no_bookmark()).then_some(bookmark);
        Self::specified(ctx, spec, pojo, bookmark)
    }

    /// Specification looked up from the pojo's type on first access.
    pub fn lazy(ctx: &MetaModelContext, pojo: Pojo) -> Self {
        Self {
            specialization: OnceLock::new(),
            context: Some(ctx.clone()),
            spec: SpecSlot::Lazy(OnceLock::new()),
            pojo: PojoSlot::Swappable(RwLock::new(pojo)),
            bookmark: RwLock::new(None),
        }
    }

    /// The shared object with neither specification nor pojo.
    pub fn unspecified() -> &'static ManagedObject {
        static UNSPECIFIED: OnceLock<ManagedObject> = OnceLock::new();
        UNSPECIFIED.get_or_init(|| ManagedObject {
            specialization: fixed(Specialization::UNSPECIFIED),
            context: None,
            spec: SpecSlot::None,
            pojo: PojoSlot::None,
            bookmark: RwLock::new(None),
        })
    }

    /// Specification without a pojo; abstract specifications are allowed.
    pub fn empty(ctx: &MetaModelContext, spec: &Arc<ObjectSpecification>) -> Self {
        Self {
            specialization: fixed(Specialization::EMPTY),
            context: Some(ctx.clone()),
            spec: SpecSlot::Eager(spec.clone()),
            pojo: PojoSlot::None,
            bookmark: RwLock::new(None),
        }
    }

    /// A list of pojos that all conform to `element_spec`.
    pub fn packed(
        ctx: &MetaModelContext,
        element_spec: &Arc<ObjectSpecification>,
        pojos: Vec<Pojo>,
    ) -> Result<Self> {
        if let Some(bad) = pojos
            .iter()
            .find(|p| !element_spec.is_assignable_from(p.type_name()))
        {
            return Err(MetaModelError::illegal_argument(format!(
                "pojo of type `{}` cannot be packed as `{}`",
                bad.type_name(),
                element_spec.type_name()
            )));
        }
        Ok(Self {
            specialization: fixed(Specialization::PACKED),
            context: Some(ctx.clone()),
            spec: SpecSlot::Eager(element_spec.clone()),
            pojo: PojoSlot::Packed(pojos),
            bookmark: RwLock::new(None),
        })
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn specialization(&self) -> Result<Specialization> {
        if let Some(specialization) = self.specialization.get() {
            return Ok(*specialization);
        }
        let spec = self.specification()?;
        let specialization = Specialization::for_sort(spec.sort())?;
        Ok(*self.specialization.get_or_init(|| specialization))
    }

    pub fn context(&self) -> Result<&MetaModelContext> {
        self.context.as_ref().ok_or_else(|| {
            MetaModelError::illegal_argument(
                "only managed objects with a specification have a metamodel context",
            )
        })
    }

    pub fn specification(&self) -> Result<Arc<ObjectSpecification>> {
        match &self.spec {
            SpecSlot::None => Err(MetaModelError::unsupported(
                "an unspecified managed object has no specification",
            )),
            SpecSlot::Eager(spec) => Ok(spec.clone()),
            SpecSlot::Lazy(cell) => {
                if let Some(spec) = cell.get() {
                    return Ok(spec.clone());
                }
                let type_name = self.pojo().map(|p| p.type_name().to_string()).unwrap_or_default();
                let spec = self.context()?.loader().spec_for_type_or_err(&type_name)?;
                Ok(cell.get_or_init(|| spec).clone())
            }
        }
    }

    /// The single pojo; `None` for unspecified, empty and packed objects.
    pub fn pojo(&self) -> Option<Pojo> {
        match &self.pojo {
            PojoSlot::Fixed(pojo) => Some(pojo.clone()),
            PojoSlot::Swappable(pojo) => Some(pojo.read().clone()),
            PojoSlot::None | PojoSlot::Packed(_) => None,
        }
    }

    pub fn packed_pojos(&self) -> Result<&[Pojo]> {
        match &self.pojo {
            PojoSlot::Packed(pojos) => Ok(pojos),
            _ => Err(MetaModelError::unsupported("only packed managed objects hold a pojo list")),
        }
    }

    pub fn is_bookmark_memoized(&self) -> bool {
        self.bookmark.read().is_some()
    }

    /// Bookmark issued by the object manager, memoized after the first call.
    /// Empty when the specialization has no bookmark.
    pub fn bookmark(&self) -> Result<Option<Bookmark>> {
        if self.specialization()?.bookmark_policy().is_no_bookmark() {
            return Ok(None);
        }
        if let Some(bookmark) = self.bookmark.read().clone() {
            return Ok(Some(bookmark));
        }
        let bookmark = self.compute_bookmark()?;
        let mut memo = self.bookmark.write();
        Ok(Some(memo.get_or_insert(bookmark).clone()))
    }

    /// Drops the memoized bookmark and computes it again, for refreshable
    /// bookmarks. For everything else this is [`Self::bookmark`].
    pub fn bookmark_refreshed(&self) -> Result<Option<Bookmark>> {
        if !self.specialization()?.bookmark_policy().is_refreshable() {
            return self.bookmark();
        }
        let bookmark = self.compute_bookmark()?;
        *self.bookmark.write() = Some(bookmark.clone());
        Ok(Some(bookmark))
    }

    fn compute_bookmark(&self) -> Result<Bookmark> {
        let spec = self.specification()?;
        let pojo = self
            .pojo()
            .ok_or_else(|| MetaModelError::IllegalState("managed object has no pojo".to_string()))?;
        self.context()?.objects().bookmark_of(&spec, pojo.as_ref())
    }

    /// Rebuilds a view model's state from `bookmark` (or its current
    /// bookmark). A no-op for every other specialization.
    pub fn refresh_viewmodel(&self, bookmark: Option<Bookmark>) -> Result<()> {
        if !self.specialization()?.is_viewmodel() {
            return Ok(());
        }
        let bookmark = match bookmark {
            Some(bookmark) => bookmark,
            None => match self.bookmark()? {
                Some(bookmark) => bookmark,
                None => return Ok(()),
            },
        };
        let spec = self.specification()?;
        let fresh = self.context()?.objects().refetch(&spec, &bookmark)?;
        self.swap_pojo(fresh)?;
        *self.bookmark.write() = Some(bookmark);
        Ok(())
    }

    /// Replaces the pojo with a fresh copy from the object manager. Only for
    /// refetchable objects (entities).
    pub fn refetch(&self) -> Result<Pojo> {
        if !self.specialization()?.pojo_policy().is_refetchable() {
            return Err(MetaModelError::unsupported(format!(
                "{} managed objects cannot be refetched",
                self.specialization()?
            )));
        }
        let bookmark = self.bookmark()?.ok_or_else(|| {
            MetaModelError::IllegalState("refetch requires a bookmark".to_string())
        })?;
        let spec = self.specification()?;
        let fresh = self.context()?.objects().refetch(&spec, &bookmark)?;
        self.swap_pojo(fresh.clone())?;
        Ok(fresh)
    }

    fn swap_pojo(&self, fresh: Pojo) -> Result<()> {
        match &self.pojo {
            PojoSlot::Swappable(pojo) => {
                *pojo.write() = fresh;
                Ok(())
            }
            _ => Err(MetaModelError::IllegalState(
                "pojo reference of this managed object is fixed".to_string(),
            )),
        }
    }

    /// Title of the pojo; empty when there is none.
    pub fn title(&self) -> Result<String> {
        match self.pojo() {
            Some(pojo) => self.specification()?.title_of(pojo.as_ref()),
            None => Ok(String::new()),
        }
    }

    pub fn icon_name(&self) -> Result<Option<String>> {
        match self.pojo() {
            Some(pojo) => self.specification()?.icon_name_of(pojo.as_ref()),
            None => Ok(None),
        }
    }

    /// Element specification of a packed object.
    pub fn element_specification(&self) -> Result<Option<Arc<ObjectSpecification>>> {
        if self.specialization()?.is_packed() {
            return self.specification().map(Some);
        }
        Ok(None)
    }

    /// One managed object per packed pojo, each with its own runtime spec.
    pub fn unpack(&self) -> Result<Vec<ManagedObject>> {
        let pojos = self.packed_pojos()?;
        let ctx = self.context()?;
        let element_spec = self.specification()?;
        pojos
            .iter()
            .map(|pojo| ManagedObject::of(ctx, &element_spec, Some(pojo.clone())))
            .collect()
    }
}
