//! Domain class declarations (`.dom`)
//!
//! The metamodel is built from an explicit metadata table rather than from
//! runtime reflection. This crate defines the canonical, versioned surface
//! syntax used to write that table down (`dom_v1`) and provides its parser and
//! typed AST.
//!
//! The AST is deliberately close to the text: annotation names and argument
//! values are kept as written. Interpreting them (which annotation kinds
//! exist, which arguments they accept) is the job of `metamodel-core`.

pub mod dom_v1;

pub use dom_v1::{parse_dom_v1, DomV1Module, DomV1ParseError};
