//! # scholia-core
//!
//! The typed property-graph engine behind Scholia, a personal research
//! knowledge base.
//!
//! ## Layers
//!
//! - `primitives`: scalar values and their string codecs
//! - `schema`: the type model. Every type has a content-derived id, the
//!   meta-types are process-wide singletons, and a registry installs a
//!   schema into a store
//! - `instance`: attribute instances, nodes and rels
//! - `storage`: the five record families over redb, with explicit
//!   non-reentrant transactions
//! - `traversal`: cycle-safe read-only graph walks
//! - `session`: composite writes (begin, mutate, commit, roll back on error)
//! - `research`: the research catalog and its domain operations
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - Single writer: one process owns the store
//! - Traversals never fail on missing or dangling nodes

// =============================================================================
// MODULES
// =============================================================================

pub mod instance;
pub mod primitives;
pub mod research;
pub mod schema;
pub mod session;
pub mod storage;
pub mod traversal;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Id, Result, ScholiaError};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use instance::{AttributeInstance, Node, Rel};
pub use primitives::{PrimitiveKind, Value};
pub use schema::{ConceptFields, SchemaRegistry, TypeClass, TypeDef};
pub use session::{Outcome, Session, Tx};
pub use storage::{RedbStore, RelFamily, StoreCounts, StoreRead, StoreWrite, Transactional};
pub use traversal::{EdgeDescriptor, NodeDescriptor, Subgraph};

// =============================================================================
// RE-EXPORTS: Research
// =============================================================================

pub use research::{
    ArticleInput, ArticleView, EntityRole, KnowledgeBase, NamedFields, ResearchCatalog,
};
