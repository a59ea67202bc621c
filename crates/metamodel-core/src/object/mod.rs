//! Managed objects: domain instances wrapped with their specification and an
//! identity policy.
//!
//! | specialization | type            | bookmark    | pojo        |
//! |----------------|-----------------|-------------|-------------|
//! | UNSPECIFIED    | none            | none        | none        |
//! | EMPTY          | abstract ok     | none        | none        |
//! | VALUE          | exact           | immutable   | immutable   |
//! | SERVICE        | exact           | immutable   | immutable   |
//! | VIEWMODEL      | exact           | refreshable | stateful    |
//! | ENTITY         | exact           | immutable   | refetchable |
//! | PACKED         | abstract ok     | none        | packed      |

mod bookmark;
mod managed;
mod manager;
mod pojo;
mod specialization;

pub use bookmark::Bookmark;
pub use managed::ManagedObject;
pub use manager::{InMemoryObjectManager, MetaModelContext, ObjectManager, SERVICE_IDENTIFIER};
pub use pojo::{DomainObject, DynObject, Pojo};
pub use specialization::{BookmarkPolicy, PojoPolicy, Specialization, TypePolicy};
