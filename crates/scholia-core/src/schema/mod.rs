//! # Type Model
//!
//! The schema layer: typeclasses, type definitions with content-derived
//! ids, the process-wide meta-types, named concept layouts, and the
//! registry that installs a schema into a store.

mod fields;
pub mod meta;
mod registry;
mod typeclass;
mod typedef;

pub use fields::{ConceptFields, optional_number, optional_text, required_text};
pub use registry::SchemaRegistry;
pub use typeclass::TypeClass;
pub use typedef::{RelArgs, TypeDef, TypeKind, type_identity};
