//! # Storage Mapping
//!
//! Record projections, the read/write/transaction contracts, and the
//! redb implementation.

mod records;
mod redb_store;
mod traits;

pub use records::{AttributeRecord, NodeRecord, RelRecord, TypeRecord};
pub use redb_store::RedbStore;
pub use traits::{
    RelFamily, StoreCounts, StoreRead, StoreWrite, Transactional, atomically,
};
