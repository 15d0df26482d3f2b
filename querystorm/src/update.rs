//! Applies an executed statement's outcome to the mirror catalog.
//!
//! On success, staged objects are promoted and destructive statements take
//! effect; on failure, the only action is discarding staged state. Either
//! way, no staged entry survives for a decided id.

use querystorm_catalog::{Catalog, DetachStatus};

use crate::ast::{AlterItem, AlterTable, ObjectRef, Statement};

pub fn update_generator(catalog: &mut Catalog, stmt: &Statement, success: bool) {
    match stmt {
        // EXPLAIN never mutates server state: anything staged while the
        // inner statement was generated is discarded.
        Statement::Explain(explain) => update_generator(catalog, &explain.inner, false),
        Statement::CreateTable(ct) => {
            let id = ct.table.name.id();
            if success {
                catalog.commit_table(id, ct.replace);
            } else {
                catalog.staged_tables.remove(&id);
            }
        }
        Statement::CreateView(cv) => {
            let id = cv.view.name.id();
            if success {
                catalog.commit_view(id, cv.replace);
            } else {
                catalog.staged_views.remove(&id);
            }
        }
        Statement::CreateDatabase(cd) => {
            if success {
                catalog.commit_database(cd.db);
            } else {
                catalog.staged_databases.remove(&cd.db);
            }
        }
        Statement::CreateFunction(cf) => {
            if success {
                catalog.commit_function(cf.id);
            } else {
                catalog.staged_functions.remove(&cf.id);
            }
        }
        Statement::Drop(drop) if success => match drop.object {
            ObjectRef::Table(t) => catalog.drop_table(t.name.id()),
            ObjectRef::View(v) => catalog.drop_view(v.name.id()),
            ObjectRef::Database(db) => catalog.drop_database(db),
        },
        Statement::Exchange(ex) if success => {
            catalog.exchange_tables(ex.lhs.name.id(), ex.rhs.name.id());
        }
        Statement::Alter(alter) => update_alter(catalog, alter, success),
        Statement::Attach(attach) if success => match attach.object {
            ObjectRef::Table(t) => catalog.set_table_attached(t.name.id(), DetachStatus::Attached),
            ObjectRef::View(v) => catalog.set_view_attached(v.name.id(), DetachStatus::Attached),
            ObjectRef::Database(db) => {
                catalog.set_database_attached(db, DetachStatus::Attached)
            }
        },
        Statement::Detach(detach) if success => {
            let status = if detach.permanently {
                DetachStatus::PermDetached
            } else {
                DetachStatus::Detached
            };
            match detach.object {
                ObjectRef::Table(t) => catalog.set_table_attached(t.name.id(), status),
                ObjectRef::View(v) => catalog.set_view_attached(v.name.id(), status),
                ObjectRef::Database(db) => catalog.set_database_attached(db, status),
            }
        }
        _ => {}
    }
}

fn update_alter(catalog: &mut Catalog, alter: &AlterTable, success: bool) {
    let id = alter.target.name.id();
    if alter.target.name.is_view() {
        if let Some(view) = catalog.views.get_mut(&id) {
            for item in &alter.items {
                if let AlterItem::ModifyQuery { ncols, .. } = item {
                    if success {
                        view.ncols = *ncols;
                    }
                    view.staged_ncols = view.ncols;
                }
            }
        }
        return;
    }

    let Some(t) = catalog.tables.get_mut(&id) else {
        return;
    };
    for item in &alter.items {
        match item {
            AlterItem::AddColumn { def, .. } => {
                let cname = def.path.col;
                if success {
                    if let Some(col) = t.staged_cols.remove(&cname) {
                        t.cols.insert(cname, col);
                    }
                }
                t.staged_cols.remove(&cname);
            }
            AlterItem::DropColumn(cname) if success => {
                t.cols.remove(cname);
            }
            AlterItem::RenameColumn { old, new } if success => {
                if let Some(mut col) = t.cols.remove(old) {
                    col.id = *new;
                    t.cols.insert(*new, col);
                }
            }
            AlterItem::ModifyColumn { def, .. } => {
                let cname = def.path.col;
                if success {
                    if let Some(col) = t.staged_cols.remove(&cname) {
                        t.cols.insert(cname, col);
                    }
                }
                t.staged_cols.remove(&cname);
            }
            AlterItem::AddIndex { def, .. } => {
                if success {
                    if let Some(idx) = t.staged_idxs.remove(&def.id) {
                        t.idxs.insert(def.id, idx);
                    }
                }
                t.staged_idxs.remove(&def.id);
            }
            AlterItem::DropIndex(iname) if success => {
                t.idxs.remove(iname);
            }
            AlterItem::AddProjection(def) => {
                if success && t.staged_projs.remove(&def.id) {
                    t.projs.insert(def.id);
                }
                t.staged_projs.remove(&def.id);
            }
            AlterItem::RemoveProjection(pname) if success => {
                t.projs.remove(pname);
            }
            AlterItem::AddConstraint(def) => {
                if success && t.staged_constrs.remove(&def.id) {
                    t.constrs.insert(def.id);
                }
                t.staged_constrs.remove(&def.id);
            }
            AlterItem::RemoveConstraint(cname) if success => {
                t.constrs.remove(cname);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use querystorm_catalog::{
        ColumnSpecial, DatabaseEngine, SqlColumn, SqlDatabase, SqlTable, SqlView, TableEngine,
    };
    use querystorm_types::SqlType;

    fn catalog_with_table() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.databases.insert(
            0,
            SqlDatabase {
                id: 0,
                attached: DetachStatus::Attached,
                engine: DatabaseEngine::Atomic,
                zoo_path: None,
            },
        );
        let mut t = SqlTable::new(0, Some(0), TableEngine::MergeTree);
        t.cols.insert(
            0,
            SqlColumn {
                id: 0,
                ctype: SqlType::Bool,
                special: ColumnSpecial::None,
                nullable: None,
                dmod: None,
            },
        );
        t.col_counter = 1;
        catalog.tables.insert(0, t);
        catalog
    }

    fn column_def(id: u32) -> ColumnDef {
        ColumnDef {
            path: ColumnPath::new(id),
            ctype: SqlType::Bool,
            nullable: None,
            default: None,
            codecs: Vec::new(),
            statistics: Vec::new(),
            settings: Vec::new(),
        }
    }

    #[test]
    fn test_create_table_commit_and_discard() {
        let mut catalog = catalog_with_table();
        catalog
            .staged_tables
            .insert(1, SqlTable::new(1, Some(0), TableEngine::Log));
        let stmt = Statement::CreateTable(CreateTable {
            replace: false,
            is_temp: false,
            table: TableRef::table(Some(0), 1),
            body: CreateTableBody::Defined(Vec::new()),
            engine: EngineClause::bare(TableEngine::Log),
            settings: Vec::new(),
            as_select: None,
        });
        update_generator(&mut catalog, &stmt, false);
        assert!(!catalog.tables.contains_key(&1));
        assert!(catalog.no_staged_state());

        catalog
            .staged_tables
            .insert(1, SqlTable::new(1, Some(0), TableEngine::Log));
        update_generator(&mut catalog, &stmt, true);
        assert!(catalog.tables.contains_key(&1));
        assert!(catalog.no_staged_state());
    }

    #[test]
    fn test_explain_wrapped_create_discards_staged() {
        let mut catalog = catalog_with_table();
        catalog
            .staged_tables
            .insert(1, SqlTable::new(1, Some(0), TableEngine::Log));
        let inner = Statement::CreateTable(CreateTable {
            replace: false,
            is_temp: false,
            table: TableRef::table(Some(0), 1),
            body: CreateTableBody::Defined(Vec::new()),
            engine: EngineClause::bare(TableEngine::Log),
            settings: Vec::new(),
            as_select: None,
        });
        let stmt = Statement::Explain(Explain {
            kind: None,
            inner: Box::new(inner),
        });
        update_generator(&mut catalog, &stmt, true);
        assert!(!catalog.tables.contains_key(&1));
        assert!(catalog.no_staged_state());
    }

    #[test]
    fn test_alter_add_and_rename_column() {
        let mut catalog = catalog_with_table();
        let t = catalog.tables.get_mut(&0).unwrap();
        t.staged_cols.insert(
            1,
            SqlColumn {
                id: 1,
                ctype: SqlType::Uuid,
                special: ColumnSpecial::None,
                nullable: None,
                dmod: None,
            },
        );
        let stmt = Statement::Alter(AlterTable {
            target: TableRef::table(Some(0), 0),
            items: vec![AlterItem::AddColumn {
                def: column_def(1),
                position: None,
            }],
        });
        update_generator(&mut catalog, &stmt, true);
        assert!(catalog.tables[&0].cols.contains_key(&1));
        assert!(catalog.no_staged_state());

        let rename = Statement::Alter(AlterTable {
            target: TableRef::table(Some(0), 0),
            items: vec![AlterItem::RenameColumn { old: 1, new: 2 }],
        });
        update_generator(&mut catalog, &rename, true);
        let t = &catalog.tables[&0];
        assert!(!t.cols.contains_key(&1));
        assert_eq!(t.cols[&2].id, 2);
        assert_eq!(t.cols[&2].ctype, SqlType::Uuid);
    }

    #[test]
    fn test_alter_failure_discards_staged_only() {
        let mut catalog = catalog_with_table();
        let t = catalog.tables.get_mut(&0).unwrap();
        t.staged_cols.insert(
            1,
            SqlColumn {
                id: 1,
                ctype: SqlType::Uuid,
                special: ColumnSpecial::None,
                nullable: None,
                dmod: None,
            },
        );
        let stmt = Statement::Alter(AlterTable {
            target: TableRef::table(Some(0), 0),
            items: vec![
                AlterItem::AddColumn {
                    def: column_def(1),
                    position: None,
                },
                AlterItem::DropColumn(0),
            ],
        });
        update_generator(&mut catalog, &stmt, false);
        let t = &catalog.tables[&0];
        assert!(t.cols.contains_key(&0), "committed column must survive");
        assert!(!t.cols.contains_key(&1));
        assert!(catalog.no_staged_state());
    }

    #[test]
    fn test_drop_database_cascade() {
        let mut catalog = catalog_with_table();
        catalog
            .tables
            .insert(1, SqlTable::new(1, Some(0), TableEngine::Log));
        catalog.views.insert(0, SqlView::new(0, Some(0)));
        let stmt = Statement::Drop(Drop {
            object: ObjectRef::Database(0),
            is_temp: false,
            if_empty: false,
            sync: false,
        });
        update_generator(&mut catalog, &stmt, true);
        assert!(catalog.tables.is_empty());
        assert!(catalog.views.is_empty());
        assert!(catalog.databases.is_empty());
    }

    #[test]
    fn test_exchange_applied_twice_restores_catalog() {
        let mut catalog = catalog_with_table();
        catalog
            .tables
            .insert(1, SqlTable::new(1, Some(0), TableEngine::Log));
        let before: Vec<(u32, TableEngine)> = catalog
            .tables
            .values()
            .map(|t| (t.id, t.engine))
            .collect();
        let stmt = Statement::Exchange(ExchangeTables {
            lhs: TableRef::table(Some(0), 0),
            rhs: TableRef::table(Some(0), 1),
        });
        update_generator(&mut catalog, &stmt, true);
        assert_eq!(catalog.tables[&0].engine, TableEngine::Log);
        update_generator(&mut catalog, &stmt, true);
        let after: Vec<(u32, TableEngine)> = catalog
            .tables
            .values()
            .map(|t| (t.id, t.engine))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_detach_attach_roundtrip() {
        let mut catalog = catalog_with_table();
        let detach = Statement::Detach(Detach {
            object: ObjectRef::Table(TableRef::table(Some(0), 0)),
            permanently: false,
            sync: false,
        });
        update_generator(&mut catalog, &detach, true);
        assert!(catalog.attached_tables().is_empty());
        assert_eq!(catalog.detached_tables(), vec![0]);

        let attach = Statement::Attach(Attach {
            object: ObjectRef::Table(TableRef::table(Some(0), 0)),
        });
        update_generator(&mut catalog, &attach, true);
        assert_eq!(catalog.attached_tables(), vec![0]);
    }
}
