use std::{collections::HashMap, sync::Arc};

use log::info;

use super::{HeapFile, TableSchema};

type TableID = u32;
type TableRC = Arc<HeapFile>;

/// Keeps track of all tables of the database and their files.
pub struct Catalog {
    tables: HashMap<TableID, TableRC>,
    names: HashMap<String, TableID>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Register a table under the given name. An existing table with
    /// the same name or the same id is replaced.
    pub fn add_table(&mut self, file: TableRC, name: &str) {
        let table_id = file.get_id();

        if let Some(old_id) = self.names.remove(name) {
            self.tables.remove(&old_id);
        }
        self.names.retain(|_, id| *id != table_id);

        info!("add table {} as {}", name, file);
        self.tables.insert(table_id, file);
        self.names.insert(name.to_string(), table_id);
    }

    /// Forget the table, its file is left untouched.
    pub fn remove_table(&mut self, table_id: &TableID) -> Option<TableRC> {
        self.names.retain(|_, id| id != table_id);
        let file = self.tables.remove(table_id)?;
        info!("remove table {}", file);
        Some(file)
    }

    pub fn get_table(&self, table_id: &TableID) -> Option<TableRC> {
        self.tables.get(table_id).cloned()
    }

    pub fn get_table_id(&self, name: &str) -> Option<TableID> {
        self.names.get(name).copied()
    }

    pub fn get_table_name(&self, table_id: &TableID) -> Option<String> {
        self.names
            .iter()
            .find(|(_, id)| *id == table_id)
            .map(|(name, _)| name.clone())
    }

    pub fn get_schema(&self, table_id: &TableID) -> Option<TableSchema> {
        self.tables.get(table_id).map(|t| t.get_schema().clone())
    }

    pub fn table_ids(&self) -> Vec<TableID> {
        self.tables.keys().copied().collect()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
        self.names.clear();
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
