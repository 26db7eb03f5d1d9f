//! # redb-backed Record Store
//!
//! Maps the five record families onto a redb database. Each family has a
//! primary table keyed by id plus explicit secondary-index tables standing
//! in for the relational indexes:
//!
//! | table              | key                        | value           |
//! |--------------------|----------------------------|-----------------|
//! | `types`            | id                         | `TypeRecord`    |
//! | `type_names`       | (typeclass, typename)      | id              |
//! | `attributes`       | id                         | `AttributeRecord` |
//! | `nodes`            | id                         | `NodeRecord`    |
//! | `node_types`       | (type, id)                 | `()`            |
//! | `rels`/`typerels`  | id                         | `RelRecord`     |
//! | `*_types`          | (type, id)                 | `()`            |
//! | `*_from`           | (type, fromid, id)         | `()`            |
//! | `*_to`             | (type, toid, id)           | `()`            |
//!
//! Rows are `postcard`-encoded. Uniqueness and reference constraints are
//! checked in [`StoreWrite`] before any table is touched.
//!
//! ## Transactions
//!
//! An open transaction is a held redb `WriteTransaction`. Reads issued
//! while it is open go through it, so they observe its uncommitted
//! writes; outside a transaction every read opens its own snapshot.

use super::records::{
    AttributeRecord, NodeRecord, RelRecord, TypeRecord, decode_row, encode_row,
};
use super::traits::{RelFamily, StoreCounts, StoreRead, StoreWrite, Transactional};
use crate::schema::TypeClass;
use crate::types::{Id, Result, ScholiaError};
use redb::backends::InMemoryBackend;
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use std::path::{Path, PathBuf};
use tracing::debug;

type RowTable = TableDefinition<'static, &'static str, &'static [u8]>;
type PairIndex = TableDefinition<'static, (&'static str, &'static str), ()>;
type TripleIndex = TableDefinition<'static, (&'static str, &'static str, &'static str), ()>;

/// Table for types: id -> serialized TypeRecord
const TYPES: RowTable = TableDefinition::new("types");

/// Unique index: (typeclass, typename) -> type id
const TYPE_NAMES: TableDefinition<(&str, &str), &str> = TableDefinition::new("type_names");

/// Table for attributes: id -> serialized AttributeRecord
const ATTRIBUTES: RowTable = TableDefinition::new("attributes");

/// Table for nodes: id -> serialized NodeRecord
const NODES: RowTable = TableDefinition::new("nodes");

/// Index: (type, node id)
const NODE_TYPES: PairIndex = TableDefinition::new("node_types");

/// Primary table and indexes of one rel-shaped family.
#[derive(Clone, Copy)]
struct RelTables {
    rows: RowTable,
    by_type: PairIndex,
    by_from: TripleIndex,
    by_to: TripleIndex,
}

const INSTANCE_RELS: RelTables = RelTables {
    rows: TableDefinition::new("rels"),
    by_type: TableDefinition::new("rel_types"),
    by_from: TableDefinition::new("rel_from"),
    by_to: TableDefinition::new("rel_to"),
};

const SCHEMA_RELS: RelTables = RelTables {
    rows: TableDefinition::new("typerels"),
    by_type: TableDefinition::new("typerel_types"),
    by_from: TableDefinition::new("typerel_from"),
    by_to: TableDefinition::new("typerel_to"),
};

const fn rel_tables(family: RelFamily) -> RelTables {
    match family {
        RelFamily::Instance => INSTANCE_RELS,
        RelFamily::Schema => SCHEMA_RELS,
    }
}

fn io_err(e: impl std::fmt::Display) -> ScholiaError {
    ScholiaError::IoError(e.to_string())
}

// =============================================================================
// READ SCOPE
// =============================================================================

/// Where a read is served from.
enum ReadScope<'a> {
    /// The open write transaction, including its uncommitted writes.
    Pending(&'a WriteTransaction),
    /// A fresh read snapshot of the last commit.
    Snapshot(ReadTransaction),
}

/// Open `$def` in whichever transaction backs `$scope` and evaluate `$body`
/// with the table bound to `$table`.
macro_rules! with_table {
    ($scope:expr, $def:expr, |$table:ident| $body:expr) => {
        match $scope {
            ReadScope::Pending(txn) => {
                let $table = txn.open_table($def).map_err(io_err)?;
                $body
            }
            ReadScope::Snapshot(txn) => {
                let $table = txn.open_table($def).map_err(io_err)?;
                $body
            }
        }
    };
}

impl ReadScope<'_> {
    fn row(&self, def: RowTable, id: &str) -> Result<Option<Vec<u8>>> {
        with_table!(self, def, |table| get_row(&table, id))
    }

    fn type_name(&self, class: &str, typename: &str) -> Result<Option<String>> {
        with_table!(self, TYPE_NAMES, |table| {
            Ok(table
                .get((class, typename))
                .map_err(io_err)?
                .map(|guard| guard.value().to_string()))
        })
    }

    fn type_names_of(&self, class: &str) -> Result<Vec<String>> {
        with_table!(self, TYPE_NAMES, |table| {
            let mut ids = Vec::new();
            for entry in table.range((class, "")..).map_err(io_err)? {
                let (key, value) = entry.map_err(io_err)?;
                if key.value().0 != class {
                    break;
                }
                ids.push(value.value().to_string());
            }
            Ok(ids)
        })
    }

    fn pairs(&self, def: PairIndex, first: &str) -> Result<Vec<String>> {
        with_table!(self, def, |table| scan_pairs(&table, first))
    }

    fn triples(&self, def: TripleIndex, first: &str, second: &str) -> Result<Vec<String>> {
        with_table!(self, def, |table| scan_triples(&table, first, second))
    }

    fn len(&self, def: RowTable) -> Result<u64> {
        with_table!(self, def, |table| table.len().map_err(io_err))
    }
}

fn get_row<T>(table: &T, id: &str) -> Result<Option<Vec<u8>>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    Ok(table
        .get(id)
        .map_err(io_err)?
        .map(|guard| guard.value().to_vec()))
}

/// Ids of every `(first, id)` key.
fn scan_pairs<T>(table: &T, first: &str) -> Result<Vec<String>>
where
    T: ReadableTable<(&'static str, &'static str), ()>,
{
    let mut ids = Vec::new();
    for entry in table.range((first, "")..).map_err(io_err)? {
        let (key, _) = entry.map_err(io_err)?;
        let (a, id) = key.value();
        if a != first {
            break;
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}

/// Ids of every `(first, second, id)` key.
fn scan_triples<T>(table: &T, first: &str, second: &str) -> Result<Vec<String>>
where
    T: ReadableTable<(&'static str, &'static str, &'static str), ()>,
{
    let mut ids = Vec::new();
    for entry in table.range((first, second, "")..).map_err(io_err)? {
        let (key, _) = entry.map_err(io_err)?;
        let (a, b, id) = key.value();
        if a != first || b != second {
            break;
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}

// =============================================================================
// STORE
// =============================================================================

/// A record store backed by redb.
///
/// - Single writer: at most one transaction is open at a time
/// - File-backed stores persist on every commit
/// - In-memory stores vanish on drop and cannot be backed up
pub struct RedbStore {
    db: Database,
    /// `None` for in-memory stores.
    path: Option<PathBuf>,
    txn: Option<WriteTransaction>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .field("in_transaction", &self.txn.is_some())
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;
        Self::init(db, Some(path.as_ref().to_path_buf()))
    }

    /// Create an empty store that lives only as long as the value.
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .map_err(io_err)?;
        Self::init(db, None)
    }

    fn init(db: Database, path: Option<PathBuf>) -> Result<Self> {
        // Create every table up front so snapshot reads never miss one.
        let write_txn = db.begin_write().map_err(io_err)?;
        {
            write_txn.open_table(TYPES).map_err(io_err)?;
            write_txn.open_table(TYPE_NAMES).map_err(io_err)?;
            write_txn.open_table(ATTRIBUTES).map_err(io_err)?;
            write_txn.open_table(NODES).map_err(io_err)?;
            write_txn.open_table(NODE_TYPES).map_err(io_err)?;
            for tables in [INSTANCE_RELS, SCHEMA_RELS] {
                write_txn.open_table(tables.rows).map_err(io_err)?;
                write_txn.open_table(tables.by_type).map_err(io_err)?;
                write_txn.open_table(tables.by_from).map_err(io_err)?;
                write_txn.open_table(tables.by_to).map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)?;
        debug!(path = ?path, "store opened");
        Ok(Self {
            db,
            path,
            txn: None,
        })
    }

    /// Path of the database file, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy the database file to `dest`.
    ///
    /// Refused while a transaction is open and for in-memory stores.
    pub fn backup(&self, dest: impl AsRef<Path>) -> Result<u64> {
        if self.txn.is_some() {
            return Err(ScholiaError::TransactionState(
                "cannot back up while a transaction is open".to_string(),
            ));
        }
        let source = self.path.as_ref().ok_or_else(|| {
            ScholiaError::PreconditionFailed("in-memory stores cannot be backed up".to_string())
        })?;
        let bytes = std::fs::copy(source, dest.as_ref()).map_err(io_err)?;
        debug!(dest = %dest.as_ref().display(), bytes, "backup written");
        Ok(bytes)
    }

    fn scope(&self) -> Result<ReadScope<'_>> {
        match &self.txn {
            Some(txn) => Ok(ReadScope::Pending(txn)),
            None => Ok(ReadScope::Snapshot(self.db.begin_read().map_err(io_err)?)),
        }
    }

    /// The open transaction, or `TransactionState` for a mutation outside one.
    fn pending(&self, operation: &str) -> Result<&WriteTransaction> {
        self.txn.as_ref().ok_or_else(|| {
            ScholiaError::TransactionState(format!("{} requires an open transaction", operation))
        })
    }

    fn read_rel_rows(&self, family: RelFamily, ids: Vec<String>) -> Result<Vec<RelRecord>> {
        let scope = self.scope()?;
        let rows = rel_tables(family).rows;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(bytes) = scope.row(rows, &id)? {
                records.push(decode_row(&bytes)?);
            }
        }
        Ok(records)
    }

    fn delete_rel_ids(&mut self, family: RelFamily, ids: Vec<String>) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            if self.delete_rel(family, &Id::new(id))? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

impl Transactional for RedbStore {
    fn begin(&mut self) -> Result<()> {
        if self.txn.is_some() {
            return Err(ScholiaError::TransactionState(
                "a transaction is already open".to_string(),
            ));
        }
        self.txn = Some(self.db.begin_write().map_err(io_err)?);
        debug!("transaction begin");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| ScholiaError::TransactionState("no open transaction to commit".into()))?;
        txn.commit().map_err(io_err)?;
        debug!("transaction commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let txn = self.txn.take().ok_or_else(|| {
            ScholiaError::TransactionState("no open transaction to roll back".into())
        })?;
        txn.abort().map_err(io_err)?;
        debug!("transaction rollback");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }
}

// =============================================================================
// READS
// =============================================================================

impl StoreRead for RedbStore {
    fn type_by_id(&self, id: &Id) -> Result<Option<TypeRecord>> {
        match self.scope()?.row(TYPES, id.as_str())? {
            Some(bytes) => Ok(Some(decode_row(&bytes)?)),
            None => Ok(None),
        }
    }

    fn type_by_name(&self, class: TypeClass, typename: &str) -> Result<Option<TypeRecord>> {
        match self.scope()?.type_name(class.as_str(), typename)? {
            Some(id) => self.type_by_id(&Id::new(id)),
            None => Ok(None),
        }
    }

    fn types_by_class(&self, class: TypeClass) -> Result<Vec<TypeRecord>> {
        let ids = self.scope()?.type_names_of(class.as_str())?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.type_by_id(&Id::new(id))? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn attribute_by_id(&self, id: &Id) -> Result<Option<AttributeRecord>> {
        match self.scope()?.row(ATTRIBUTES, id.as_str())? {
            Some(bytes) => Ok(Some(decode_row(&bytes)?)),
            None => Ok(None),
        }
    }

    fn node_by_id(&self, id: &Id) -> Result<Option<NodeRecord>> {
        match self.scope()?.row(NODES, id.as_str())? {
            Some(bytes) => Ok(Some(decode_row(&bytes)?)),
            None => Ok(None),
        }
    }

    fn nodes_by_type(&self, node_type: &Id) -> Result<Vec<NodeRecord>> {
        let scope = self.scope()?;
        let ids = scope.pairs(NODE_TYPES, node_type.as_str())?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(bytes) = scope.row(NODES, &id)? {
                records.push(decode_row(&bytes)?);
            }
        }
        Ok(records)
    }

    fn rel_by_id(&self, family: RelFamily, id: &Id) -> Result<Option<RelRecord>> {
        match self.scope()?.row(rel_tables(family).rows, id.as_str())? {
            Some(bytes) => Ok(Some(decode_row(&bytes)?)),
            None => Ok(None),
        }
    }

    fn rels_by_type(&self, family: RelFamily, rel_type: &Id) -> Result<Vec<RelRecord>> {
        let ids = self
            .scope()?
            .pairs(rel_tables(family).by_type, rel_type.as_str())?;
        self.read_rel_rows(family, ids)
    }

    fn rels_by_from(
        &self,
        family: RelFamily,
        rel_type: &Id,
        from: &Id,
    ) -> Result<Vec<RelRecord>> {
        let ids = self.scope()?.triples(
            rel_tables(family).by_from,
            rel_type.as_str(),
            from.as_str(),
        )?;
        self.read_rel_rows(family, ids)
    }

    fn rels_by_to(&self, family: RelFamily, rel_type: &Id, to: &Id) -> Result<Vec<RelRecord>> {
        let ids =
            self.scope()?
                .triples(rel_tables(family).by_to, rel_type.as_str(), to.as_str())?;
        self.read_rel_rows(family, ids)
    }

    fn counts(&self) -> Result<StoreCounts> {
        let scope = self.scope()?;
        Ok(StoreCounts {
            types: scope.len(TYPES)?,
            attributes: scope.len(ATTRIBUTES)?,
            nodes: scope.len(NODES)?,
            rels: scope.len(INSTANCE_RELS.rows)?,
            type_rels: scope.len(SCHEMA_RELS.rows)?,
        })
    }
}

// =============================================================================
// WRITES
// =============================================================================

impl StoreWrite for RedbStore {
    fn merge_type(&mut self, record: &TypeRecord) -> Result<()> {
        let txn = self.pending("merge_type")?;
        let class = record.typeclass.as_str();
        if let Some(owner) = self.scope()?.type_name(class, &record.typename)? {
            if owner != record.id.as_str() {
                return Err(ScholiaError::ConstraintViolation(format!(
                    "{} '{}' already exists with id {}",
                    class, record.typename, owner
                )));
            }
        }
        let previous = self.type_by_id(&record.id)?;
        let bytes = encode_row(record)?;

        let mut names = txn.open_table(TYPE_NAMES).map_err(io_err)?;
        if let Some(old) = &previous {
            names
                .remove((old.typeclass.as_str(), old.typename.as_str()))
                .map_err(io_err)?;
        }
        names
            .insert((class, record.typename.as_str()), record.id.as_str())
            .map_err(io_err)?;
        let mut types = txn.open_table(TYPES).map_err(io_err)?;
        types
            .insert(record.id.as_str(), bytes.as_slice())
            .map_err(io_err)?;
        Ok(())
    }

    fn merge_attribute(&mut self, record: &AttributeRecord) -> Result<()> {
        let txn = self.pending("merge_attribute")?;
        if self.type_by_id(&record.type_id)?.is_none() {
            return Err(ScholiaError::ConstraintViolation(format!(
                "attribute {} references missing type {}",
                record.id, record.type_id
            )));
        }
        let bytes = encode_row(record)?;
        let mut attributes = txn.open_table(ATTRIBUTES).map_err(io_err)?;
        attributes
            .insert(record.id.as_str(), bytes.as_slice())
            .map_err(io_err)?;
        Ok(())
    }

    fn merge_node(&mut self, record: &NodeRecord) -> Result<()> {
        let txn = self.pending("merge_node")?;
        if self.type_by_id(&record.type_id)?.is_none() {
            return Err(ScholiaError::ConstraintViolation(format!(
                "node '{}' references missing type {}",
                record.name, record.type_id
            )));
        }
        let previous = self.node_by_id(&record.id)?;
        let bytes = encode_row(record)?;

        let mut index = txn.open_table(NODE_TYPES).map_err(io_err)?;
        if let Some(old) = &previous {
            index
                .remove((old.type_id.as_str(), old.id.as_str()))
                .map_err(io_err)?;
        }
        index
            .insert((record.type_id.as_str(), record.id.as_str()), ())
            .map_err(io_err)?;
        let mut nodes = txn.open_table(NODES).map_err(io_err)?;
        nodes
            .insert(record.id.as_str(), bytes.as_slice())
            .map_err(io_err)?;
        Ok(())
    }

    fn merge_rel(&mut self, family: RelFamily, record: &RelRecord) -> Result<()> {
        let txn = self.pending("merge_rel")?;
        if self.type_by_id(&record.type_id)?.is_none() {
            return Err(ScholiaError::ConstraintViolation(format!(
                "{} '{}' references missing type {}",
                family, record.name, record.type_id
            )));
        }
        for endpoint in [&record.fromid, &record.toid] {
            let exists = match family {
                RelFamily::Instance => self.node_by_id(endpoint)?.is_some(),
                RelFamily::Schema => self.type_by_id(endpoint)?.is_some(),
            };
            if !exists {
                return Err(ScholiaError::ConstraintViolation(format!(
                    "{} '{}' references missing endpoint {}",
                    family, record.name, endpoint
                )));
            }
        }
        let previous = self.rel_by_id(family, &record.id)?;
        if let Some(old) = &previous {
            if old.fromid != record.fromid || old.toid != record.toid {
                return Err(ScholiaError::ConstraintViolation(format!(
                    "{} '{}' already links {} to {}",
                    family, record.name, old.fromid, old.toid
                )));
            }
        }
        let bytes = encode_row(record)?;
        let tables = rel_tables(family);
        let (rel_type, id) = (record.type_id.as_str(), record.id.as_str());

        {
            let mut by_type = txn.open_table(tables.by_type).map_err(io_err)?;
            if let Some(old) = &previous {
                by_type
                    .remove((old.type_id.as_str(), id))
                    .map_err(io_err)?;
            }
            by_type.insert((rel_type, id), ()).map_err(io_err)?;
        }
        {
            let mut by_from = txn.open_table(tables.by_from).map_err(io_err)?;
            if let Some(old) = &previous {
                by_from
                    .remove((old.type_id.as_str(), old.fromid.as_str(), id))
                    .map_err(io_err)?;
            }
            by_from
                .insert((rel_type, record.fromid.as_str(), id), ())
                .map_err(io_err)?;
        }
        {
            let mut by_to = txn.open_table(tables.by_to).map_err(io_err)?;
            if let Some(old) = &previous {
                by_to
                    .remove((old.type_id.as_str(), old.toid.as_str(), id))
                    .map_err(io_err)?;
            }
            by_to
                .insert((rel_type, record.toid.as_str(), id), ())
                .map_err(io_err)?;
        }
        let mut rows = txn.open_table(tables.rows).map_err(io_err)?;
        rows.insert(id, bytes.as_slice()).map_err(io_err)?;
        Ok(())
    }

    fn delete_type(&mut self, id: &Id) -> Result<bool> {
        let txn = self.pending("delete_type")?;
        let Some(old) = self.type_by_id(id)? else {
            return Ok(false);
        };
        {
            let mut names = txn.open_table(TYPE_NAMES).map_err(io_err)?;
            names
                .remove((old.typeclass.as_str(), old.typename.as_str()))
                .map_err(io_err)?;
        }
        let mut types = txn.open_table(TYPES).map_err(io_err)?;
        types.remove(id.as_str()).map_err(io_err)?;
        Ok(true)
    }

    fn delete_attribute(&mut self, id: &Id) -> Result<bool> {
        let txn = self.pending("delete_attribute")?;
        let mut attributes = txn.open_table(ATTRIBUTES).map_err(io_err)?;
        let removed = attributes.remove(id.as_str()).map_err(io_err)?.is_some();
        Ok(removed)
    }

    fn delete_node(&mut self, id: &Id) -> Result<bool> {
        let txn = self.pending("delete_node")?;
        let Some(old) = self.node_by_id(id)? else {
            return Ok(false);
        };
        {
            let mut index = txn.open_table(NODE_TYPES).map_err(io_err)?;
            index
                .remove((old.type_id.as_str(), id.as_str()))
                .map_err(io_err)?;
        }
        let mut nodes = txn.open_table(NODES).map_err(io_err)?;
        nodes.remove(id.as_str()).map_err(io_err)?;
        Ok(true)
    }

    fn delete_rel(&mut self, family: RelFamily, id: &Id) -> Result<bool> {
        let txn = self.pending("delete_rel")?;
        let Some(old) = self.rel_by_id(family, id)? else {
            return Ok(false);
        };
        let tables = rel_tables(family);
        let rel_type = old.type_id.as_str();
        {
            let mut by_type = txn.open_table(tables.by_type).map_err(io_err)?;
            by_type.remove((rel_type, id.as_str())).map_err(io_err)?;
        }
        {
            let mut by_from = txn.open_table(tables.by_from).map_err(io_err)?;
            by_from
                .remove((rel_type, old.fromid.as_str(), id.as_str()))
                .map_err(io_err)?;
        }
        {
            let mut by_to = txn.open_table(tables.by_to).map_err(io_err)?;
            by_to
                .remove((rel_type, old.toid.as_str(), id.as_str()))
                .map_err(io_err)?;
        }
        let mut rows = txn.open_table(tables.rows).map_err(io_err)?;
        rows.remove(id.as_str()).map_err(io_err)?;
        Ok(true)
    }

    fn delete_rels_by_from(
        &mut self,
        family: RelFamily,
        rel_type: &Id,
        from: &Id,
    ) -> Result<usize> {
        self.pending("delete_rels_by_from")?;
        let ids = self.scope()?.triples(
            rel_tables(family).by_from,
            rel_type.as_str(),
            from.as_str(),
        )?;
        let removed = self.delete_rel_ids(family, ids)?;
        debug!(%family, %rel_type, %from, removed, "bulk delete by source");
        Ok(removed)
    }

    fn delete_rels_by_to(&mut self, family: RelFamily, rel_type: &Id, to: &Id) -> Result<usize> {
        self.pending("delete_rels_by_to")?;
        let ids =
            self.scope()?
                .triples(rel_tables(family).by_to, rel_type.as_str(), to.as_str())?;
        let removed = self.delete_rel_ids(family, ids)?;
        debug!(%family, %rel_type, %to, removed, "bulk delete by target");
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::instance::{AttributeInstance, Node, Rel};
    use crate::primitives::{PrimitiveKind, Value};
    use crate::schema::{TypeDef, meta};
    use tempfile::tempdir;

    struct Fixture {
        name: TypeDef,
        person: TypeDef,
        knows: TypeDef,
    }

    fn fixture() -> Fixture {
        let name = TypeDef::attribute("person.name", true, PrimitiveKind::String).expect("attr");
        let person = TypeDef::concept("person", &[&name]).expect("concept");
        let knows = TypeDef::instance_rel("knows", &person, &person, &[]).expect("rel");
        Fixture {
            name,
            person,
            knows,
        }
    }

    fn install(store: &mut RedbStore, fx: &Fixture) {
        store.begin().expect("begin");
        for def in meta::builtins() {
            store.merge_type(&def.to_record()).expect("meta");
        }
        for def in [&fx.name, &fx.person, &fx.knows] {
            store.merge_type(&def.to_record()).expect("type");
        }
        store.commit().expect("commit");
    }

    fn installed() -> (RedbStore, Fixture) {
        let mut store = RedbStore::in_memory().expect("store");
        let fx = fixture();
        install(&mut store, &fx);
        (store, fx)
    }

    fn person(fx: &Fixture, name: &str) -> Node {
        Node::new(&fx.person, name).expect("node")
    }

    #[test]
    fn transactions_do_not_nest() {
        let mut store = RedbStore::in_memory().expect("store");
        store.begin().expect("begin");
        assert!(matches!(
            store.begin(),
            Err(ScholiaError::TransactionState(_))
        ));
        store.rollback().expect("rollback");
        assert!(matches!(
            store.commit(),
            Err(ScholiaError::TransactionState(_))
        ));
        assert!(matches!(
            store.rollback(),
            Err(ScholiaError::TransactionState(_))
        ));
    }

    #[test]
    fn mutation_outside_transaction_is_rejected() {
        let mut store = RedbStore::in_memory().expect("store");
        let record = meta::concept_type().to_record();
        assert!(matches!(
            store.merge_type(&record),
            Err(ScholiaError::TransactionState(_))
        ));
        assert!(matches!(
            store.delete_node(&Id::new("x")),
            Err(ScholiaError::TransactionState(_))
        ));
    }

    #[test]
    fn type_lookup_by_name() {
        let (store, fx) = installed();
        let found = store
            .type_by_name(TypeClass::Concept, "person")
            .expect("query")
            .expect("present");
        assert_eq!(&found.id, fx.person.id());
        assert!(
            store
                .type_by_name(TypeClass::Attribute, "person")
                .expect("query")
                .is_none()
        );
        let concepts = store.types_by_class(TypeClass::Concept).expect("query");
        assert_eq!(concepts.len(), 1);
    }

    #[test]
    fn type_name_must_be_unique() {
        let (mut store, fx) = installed();
        let mut clash = fx.person.to_record();
        clash.id = Id::new("someone-else");
        store.begin().expect("begin");
        assert!(matches!(
            store.merge_type(&clash),
            Err(ScholiaError::ConstraintViolation(_))
        ));
        store.rollback().expect("rollback");
    }

    #[test]
    fn node_merge_is_idempotent() {
        let (mut store, fx) = installed();
        let node = person(&fx, "Ada");
        store.begin().expect("begin");
        store.merge_node(&node.to_record()).expect("merge");
        store.merge_node(&node.to_record()).expect("merge again");
        store.commit().expect("commit");

        assert_eq!(store.counts().expect("counts").nodes, 1);
        assert_eq!(
            store.nodes_by_type(fx.person.id()).expect("query").len(),
            1
        );
        let found = store
            .node_by_name(fx.person.id(), "Ada")
            .expect("query")
            .expect("present");
        assert_eq!(found, node.to_record());
    }

    #[test]
    fn node_merge_updates_in_place() {
        let (mut store, fx) = installed();
        let node = person(&fx, "Ada");
        store.begin().expect("begin");
        store.merge_node(&node.to_record()).expect("merge");
        let updated = node.clone().with_attributes(vec![Id::new("a1")]);
        store.merge_node(&updated.to_record()).expect("update");
        store.commit().expect("commit");

        let found = store.node_by_id(node.id()).expect("query").expect("present");
        assert_eq!(found.attr, "a1");
    }

    #[test]
    fn node_requires_stored_type() {
        let mut store = RedbStore::in_memory().expect("store");
        let fx = fixture();
        store.begin().expect("begin");
        assert!(matches!(
            store.merge_node(&person(&fx, "Ada").to_record()),
            Err(ScholiaError::ConstraintViolation(_))
        ));
        store.rollback().expect("rollback");
    }

    #[test]
    fn attribute_round_trip_through_store() {
        let (mut store, fx) = installed();
        let attr = AttributeInstance::new(&fx.name, Value::text("Ada")).expect("attr");
        store.begin().expect("begin");
        store.merge_attribute(&attr.to_record()).expect("merge");
        store.commit().expect("commit");
        let record = store
            .attribute_by_id(attr.id())
            .expect("query")
            .expect("present");
        let back = AttributeInstance::from_record(&record, &fx.name).expect("decode");
        assert_eq!(back.value(), &Value::text("Ada"));
    }

    #[test]
    fn rel_endpoints_must_exist() {
        let (mut store, fx) = installed();
        let ada = person(&fx, "Ada");
        let ghost = person(&fx, "Ghost");
        store.begin().expect("begin");
        store.merge_node(&ada.to_record()).expect("merge");
        let rel = Rel::link(&fx.knows, &ada, &ghost).expect("link");
        assert!(matches!(
            store.merge_rel(RelFamily::Instance, &rel.to_record()),
            Err(ScholiaError::ConstraintViolation(_))
        ));
        store.rollback().expect("rollback");
    }

    #[test]
    fn rel_name_collision_is_rejected() {
        let (mut store, fx) = installed();
        let a = person(&fx, "A");
        let b = person(&fx, "B");
        let c = person(&fx, "C");
        store.begin().expect("begin");
        for node in [&a, &b, &c] {
            store.merge_node(&node.to_record()).expect("merge");
        }
        let first = Rel::new(&fx.knows, "shared", a.id().clone(), b.id().clone()).expect("rel");
        store
            .merge_rel(RelFamily::Instance, &first.to_record())
            .expect("merge");
        let second = Rel::new(&fx.knows, "shared", a.id().clone(), c.id().clone()).expect("rel");
        assert!(matches!(
            store.merge_rel(RelFamily::Instance, &second.to_record()),
            Err(ScholiaError::ConstraintViolation(_))
        ));
        // Same endpoints is a plain upsert.
        store
            .merge_rel(RelFamily::Instance, &first.to_record())
            .expect("re-merge");
        store.commit().expect("commit");
    }

    #[test]
    fn rel_indexes() {
        let (mut store, fx) = installed();
        let a = person(&fx, "A");
        let b = person(&fx, "B");
        let c = person(&fx, "C");
        store.begin().expect("begin");
        for node in [&a, &b, &c] {
            store.merge_node(&node.to_record()).expect("merge");
        }
        for (from, to) in [(&a, &b), (&a, &c), (&b, &c)] {
            let rel = Rel::link(&fx.knows, from, to).expect("link");
            store
                .merge_rel(RelFamily::Instance, &rel.to_record())
                .expect("merge");
        }
        store.commit().expect("commit");

        let knows = fx.knows.id();
        assert_eq!(
            store
                .rels_by_from(RelFamily::Instance, knows, a.id())
                .expect("query")
                .len(),
            2
        );
        assert_eq!(
            store
                .rels_by_to(RelFamily::Instance, knows, c.id())
                .expect("query")
                .len(),
            2
        );
        assert_eq!(
            store
                .rels_by_type(RelFamily::Instance, knows)
                .expect("query")
                .len(),
            3
        );
        assert!(
            store
                .rels_by_type(RelFamily::Schema, knows)
                .expect("query")
                .is_empty()
        );
        let name = format!("{}_knows_{}", a.id(), b.id());
        assert!(
            store
                .rel_by_name(RelFamily::Instance, knows, &name)
                .expect("query")
                .is_some()
        );
    }

    #[test]
    fn bulk_delete_by_endpoint() {
        let (mut store, fx) = installed();
        let a = person(&fx, "A");
        let b = person(&fx, "B");
        let c = person(&fx, "C");
        store.begin().expect("begin");
        for node in [&a, &b, &c] {
            store.merge_node(&node.to_record()).expect("merge");
        }
        for (from, to) in [(&a, &b), (&a, &c), (&b, &c)] {
            let rel = Rel::link(&fx.knows, from, to).expect("link");
            store
                .merge_rel(RelFamily::Instance, &rel.to_record())
                .expect("merge");
        }
        let removed = store
            .delete_rels_by_to(RelFamily::Instance, fx.knows.id(), c.id())
            .expect("delete");
        assert_eq!(removed, 2);
        let removed = store
            .delete_rels_by_from(RelFamily::Instance, fx.knows.id(), a.id())
            .expect("delete");
        assert_eq!(removed, 1);
        store.commit().expect("commit");

        assert_eq!(store.counts().expect("counts").rels, 0);
        assert!(
            store
                .rels_by_from(RelFamily::Instance, fx.knows.id(), b.id())
                .expect("query")
                .is_empty()
        );
    }

    #[test]
    fn deletes_are_noops_when_absent() {
        let (mut store, _) = installed();
        store.begin().expect("begin");
        assert!(!store.delete_node(&Id::new("missing")).expect("delete"));
        assert!(!store.delete_attribute(&Id::new("missing")).expect("delete"));
        assert!(
            !store
                .delete_rel(RelFamily::Schema, &Id::new("missing"))
                .expect("delete")
        );
        store.commit().expect("commit");
    }

    #[test]
    fn deleting_a_node_does_not_cascade() {
        let (mut store, fx) = installed();
        let a = person(&fx, "A");
        let b = person(&fx, "B");
        let rel = Rel::link(&fx.knows, &a, &b).expect("link");
        store.begin().expect("begin");
        store.merge_node(&a.to_record()).expect("merge");
        store.merge_node(&b.to_record()).expect("merge");
        store
            .merge_rel(RelFamily::Instance, &rel.to_record())
            .expect("merge");
        assert!(store.delete_node(b.id()).expect("delete"));
        store.commit().expect("commit");

        assert!(store.node_by_id(b.id()).expect("query").is_none());
        assert!(
            store
                .rel_by_id(RelFamily::Instance, rel.id())
                .expect("query")
                .is_some()
        );
        assert_eq!(store.nodes_by_type(fx.person.id()).expect("query").len(), 1);
    }

    #[test]
    fn reads_see_uncommitted_writes_until_rollback() {
        let (mut store, fx) = installed();
        let node = person(&fx, "Ada");
        store.begin().expect("begin");
        store.merge_node(&node.to_record()).expect("merge");
        assert!(store.node_by_id(node.id()).expect("query").is_some());
        store.rollback().expect("rollback");
        assert!(store.node_by_id(node.id()).expect("query").is_none());
        assert_eq!(store.counts().expect("counts").nodes, 0);
    }

    #[test]
    fn schema_family_links_types() {
        let (mut store, fx) = installed();
        let shadow = fx.knows.shadow_type_rel().expect("shadow");
        let name = format!("{}_knows_{}", fx.person.id(), fx.person.id());
        let rel = Rel::new(&shadow, &name, fx.person.id().clone(), fx.person.id().clone())
            .expect("rel");
        store.begin().expect("begin");
        store.merge_type(&shadow.to_record()).expect("shadow type");
        store
            .merge_rel(RelFamily::Schema, &rel.to_record())
            .expect("typerel");
        store.commit().expect("commit");

        let counts = store.counts().expect("counts");
        assert_eq!(counts.type_rels, 1);
        assert_eq!(counts.rels, 0);
    }

    #[test]
    fn persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let fx = fixture();
        let node = person(&fx, "Ada");
        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            install(&mut store, &fx);
            store.begin().expect("begin");
            store.merge_node(&node.to_record()).expect("merge");
            store.commit().expect("commit");
        }
        {
            let store = RedbStore::open(&db_path).expect("reopen db");
            assert!(store.node_by_id(node.id()).expect("query").is_some());
            assert_eq!(store.path(), Some(db_path.as_path()));
        }
    }

    #[test]
    fn backup_copies_the_file() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("live.redb");
        let copy_path = temp.path().join("copy.redb");
        let fx = fixture();
        let node = person(&fx, "Ada");
        let mut store = RedbStore::open(&db_path).expect("open db");
        install(&mut store, &fx);
        store.begin().expect("begin");
        store.merge_node(&node.to_record()).expect("merge");
        assert!(matches!(
            store.backup(&copy_path),
            Err(ScholiaError::TransactionState(_))
        ));
        store.commit().expect("commit");
        assert!(store.backup(&copy_path).expect("backup") > 0);
        drop(store);

        let restored = RedbStore::open(&copy_path).expect("open copy");
        assert!(restored.node_by_id(node.id()).expect("query").is_some());
    }

    #[test]
    fn in_memory_store_has_no_backup() {
        let store = RedbStore::in_memory().expect("store");
        let temp = tempdir().expect("temp dir");
        assert!(matches!(
            store.backup(temp.path().join("x.redb")),
            Err(ScholiaError::PreconditionFailed(_))
        ));
    }
}
