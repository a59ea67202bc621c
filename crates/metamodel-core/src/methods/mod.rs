//! Locating accessor and support methods on a class.

mod finder;
pub mod naming;

pub use finder::{
    ConflictingAnnotations, MethodFinder, MethodFinderOptions, MethodRemover, ReturnExpectation,
};
