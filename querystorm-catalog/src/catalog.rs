use std::collections::BTreeMap;

use log::debug;

use crate::objects::{DetachStatus, SqlDatabase, SqlFunction, SqlTable, SqlView};

/// In-process mirror of the server's schema.
///
/// Objects live in key-sorted maps so that every iteration feeding a random
/// choice is deterministic. Each object kind has a committed and a staged
/// map; DDL stages new objects and the update pipeline promotes or discards
/// them once the server has decided. The catalog is owned by a single
/// generation thread and is never shared.
#[derive(Default)]
pub struct Catalog {
    pub databases: BTreeMap<u32, SqlDatabase>,
    pub staged_databases: BTreeMap<u32, SqlDatabase>,
    pub tables: BTreeMap<u32, SqlTable>,
    pub staged_tables: BTreeMap<u32, SqlTable>,
    pub views: BTreeMap<u32, SqlView>,
    pub staged_views: BTreeMap<u32, SqlView>,
    pub functions: BTreeMap<u32, SqlFunction>,
    pub staged_functions: BTreeMap<u32, SqlFunction>,
    database_counter: u32,
    table_counter: u32,
    view_counter: u32,
    function_counter: u32,
    zoo_path_counter: u32,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    pub fn next_database_id(&mut self) -> u32 {
        let id = self.database_counter;
        self.database_counter += 1;
        id
    }

    pub fn next_table_id(&mut self) -> u32 {
        let id = self.table_counter;
        self.table_counter += 1;
        id
    }

    pub fn next_view_id(&mut self) -> u32 {
        let id = self.view_counter;
        self.view_counter += 1;
        id
    }

    pub fn next_function_id(&mut self) -> u32 {
        let id = self.function_counter;
        self.function_counter += 1;
        id
    }

    pub fn next_zoo_path(&mut self) -> u32 {
        let id = self.zoo_path_counter;
        self.zoo_path_counter += 1;
        id
    }

    fn database_attached(&self, id: Option<u32>) -> bool {
        match id {
            None => true,
            Some(id) => self
                .databases
                .get(&id)
                .is_some_and(|d| d.attached == DetachStatus::Attached),
        }
    }

    pub fn table_attached(&self, t: &SqlTable) -> bool {
        self.database_attached(t.db) && t.attached == DetachStatus::Attached
    }

    pub fn view_attached(&self, v: &SqlView) -> bool {
        self.database_attached(v.db) && v.attached == DetachStatus::Attached
    }

    /// Ids of committed tables matching `pred`, in ascending order.
    pub fn filter_tables(&self, pred: impl Fn(&Catalog, &SqlTable) -> bool) -> Vec<u32> {
        self.tables
            .values()
            .filter(|t| pred(self, t))
            .map(|t| t.id)
            .collect()
    }

    pub fn filter_views(&self, pred: impl Fn(&Catalog, &SqlView) -> bool) -> Vec<u32> {
        self.views
            .values()
            .filter(|v| pred(self, v))
            .map(|v| v.id)
            .collect()
    }

    pub fn filter_databases(&self, pred: impl Fn(&SqlDatabase) -> bool) -> Vec<u32> {
        self.databases
            .values()
            .filter(|d| pred(d))
            .map(|d| d.id)
            .collect()
    }

    pub fn attached_tables(&self) -> Vec<u32> {
        self.filter_tables(|c, t| c.table_attached(t))
    }

    /// Attached tables whose engine admits TRUNCATE, the candidate pool for
    /// the dump/reload oracle.
    pub fn attached_tables_for_oracle(&self) -> Vec<u32> {
        self.filter_tables(|c, t| c.table_attached(t) && !t.is_not_truncable())
    }

    pub fn detached_tables(&self) -> Vec<u32> {
        self.filter_tables(|c, t| !c.table_attached(t))
    }

    pub fn attached_views(&self) -> Vec<u32> {
        self.filter_views(|c, v| c.view_attached(v))
    }

    pub fn detached_views(&self) -> Vec<u32> {
        self.filter_views(|c, v| !c.view_attached(v))
    }

    pub fn attached_databases(&self) -> Vec<u32> {
        self.filter_databases(|d| d.attached == DetachStatus::Attached)
    }

    pub fn detached_databases(&self) -> Vec<u32> {
        self.filter_databases(|d| d.attached != DetachStatus::Attached)
    }

    pub fn deterministic_functions(&self) -> Vec<u32> {
        self.functions
            .values()
            .filter(|f| f.is_deterministic)
            .map(|f| f.id)
            .collect()
    }

    pub fn commit_database(&mut self, id: u32) {
        if let Some(d) = self.staged_databases.remove(&id) {
            self.databases.insert(id, d);
        }
    }

    pub fn commit_table(&mut self, id: u32, replace: bool) {
        if replace {
            self.tables.remove(&id);
        }
        if let Some(t) = self.staged_tables.remove(&id) {
            self.tables.insert(id, t);
        }
    }

    pub fn commit_view(&mut self, id: u32, replace: bool) {
        if replace {
            self.views.remove(&id);
        }
        if let Some(v) = self.staged_views.remove(&id) {
            self.views.insert(id, v);
        }
    }

    pub fn commit_function(&mut self, id: u32) {
        if let Some(f) = self.staged_functions.remove(&id) {
            self.functions.insert(id, f);
        }
    }

    pub fn drop_table(&mut self, id: u32) {
        self.tables.remove(&id);
    }

    pub fn drop_view(&mut self, id: u32) {
        self.views.remove(&id);
    }

    pub fn drop_function(&mut self, id: u32) {
        self.functions.remove(&id);
    }

    /// Dropping a database removes every table and view it contains.
    pub fn drop_database(&mut self, id: u32) {
        let before = self.tables.len() + self.views.len();
        self.tables.retain(|_, t| t.db != Some(id));
        self.views.retain(|_, v| v.db != Some(id));
        self.databases.remove(&id);
        debug!(
            "dropped d{id} cascading over {} objects",
            before - self.tables.len() - self.views.len()
        );
    }

    /// Swap the identities of two committed tables. The owning databases
    /// travel with the structure, only the ids flip.
    pub fn exchange_tables(&mut self, a: u32, b: u32) {
        let mut ta = self.tables.remove(&a).expect("exchange of unknown table");
        let mut tb = self.tables.remove(&b).expect("exchange of unknown table");
        ta.id = b;
        tb.id = a;
        self.tables.insert(b, ta);
        self.tables.insert(a, tb);
    }

    pub fn set_table_attached(&mut self, id: u32, status: DetachStatus) {
        if let Some(t) = self.tables.get_mut(&id) {
            t.attached = status;
        }
    }

    pub fn set_view_attached(&mut self, id: u32, status: DetachStatus) {
        if let Some(v) = self.views.get_mut(&id) {
            v.attached = status;
        }
    }

    pub fn set_database_attached(&mut self, id: u32, status: DetachStatus) {
        if let Some(d) = self.databases.get_mut(&id) {
            d.attached = status;
        }
    }

    /// True when no staged entry remains anywhere, at catalog or table level.
    pub fn no_staged_state(&self) -> bool {
        self.staged_databases.is_empty()
            && self.staged_tables.is_empty()
            && self.staged_views.is_empty()
            && self.staged_functions.is_empty()
            && self
                .tables
                .values()
                .all(|t| {
                    t.staged_cols.is_empty()
                        && t.staged_idxs.is_empty()
                        && t.staged_projs.is_empty()
                        && t.staged_constrs.is_empty()
                })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{DatabaseEngine, TableEngine};

    fn database(id: u32) -> SqlDatabase {
        SqlDatabase {
            id,
            attached: DetachStatus::Attached,
            engine: DatabaseEngine::Atomic,
            zoo_path: None,
        }
    }

    #[test]
    fn test_counters_are_monotone() {
        let mut c = Catalog::new();
        assert_eq!(c.next_table_id(), 0);
        assert_eq!(c.next_table_id(), 1);
        assert_eq!(c.next_database_id(), 0);
        assert_eq!(c.next_table_id(), 2);
    }

    #[test]
    fn test_detached_database_hides_tables() {
        let mut c = Catalog::new();
        c.databases.insert(0, database(0));
        c.tables.insert(0, SqlTable::new(0, Some(0), TableEngine::Log));
        assert_eq!(c.attached_tables(), vec![0]);
        c.set_database_attached(0, DetachStatus::Detached);
        assert!(c.attached_tables().is_empty());
        assert_eq!(c.detached_tables(), vec![0]);
    }

    #[test]
    fn test_drop_database_cascades() {
        let mut c = Catalog::new();
        c.databases.insert(0, database(0));
        c.databases.insert(1, database(1));
        c.tables.insert(0, SqlTable::new(0, Some(0), TableEngine::Log));
        c.tables.insert(1, SqlTable::new(1, Some(1), TableEngine::Log));
        c.views.insert(0, SqlView::new(0, Some(0)));
        c.drop_database(0);
        assert_eq!(c.tables.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert!(c.views.is_empty());
        assert!(!c.databases.contains_key(&0));
    }

    #[test]
    fn test_exchange_is_involution() {
        let mut c = Catalog::new();
        c.databases.insert(0, database(0));
        let mut a = SqlTable::new(0, Some(0), TableEngine::MergeTree);
        a.col_counter = 3;
        let b = SqlTable::new(1, Some(0), TableEngine::Log);
        c.tables.insert(0, a);
        c.tables.insert(1, b);
        c.exchange_tables(0, 1);
        assert_eq!(c.tables[&1].engine, TableEngine::MergeTree);
        assert_eq!(c.tables[&1].col_counter, 3);
        c.exchange_tables(0, 1);
        assert_eq!(c.tables[&0].engine, TableEngine::MergeTree);
        assert_eq!(c.tables[&0].col_counter, 3);
        assert_eq!(c.tables[&1].engine, TableEngine::Log);
    }

    #[test]
    fn test_oracle_pool_excludes_untruncable() {
        let mut c = Catalog::new();
        c.databases.insert(0, database(0));
        c.tables.insert(0, SqlTable::new(0, Some(0), TableEngine::Set));
        c.tables.insert(1, SqlTable::new(1, Some(0), TableEngine::MergeTree));
        assert_eq!(c.attached_tables_for_oracle(), vec![1]);
    }
}
