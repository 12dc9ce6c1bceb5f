use std::collections::HashMap;

use tracing::{debug, error, info};

use crate::ast::{ColumnsSelect, Command};
use crate::database::{Database, name_key};
use crate::error::{DbError, Result};
use crate::parser::parse_command;
use crate::persistence::{NoPersistence, Persistence};
use crate::table::QueryResult;

/// Every database the server knows about, keyed by [name_key], plus the
/// persistence layer behind them.
pub struct Store {
    databases: HashMap<String, Database>,
    persistence: Box<dyn Persistence>,
}

impl Store {
    pub fn new(persistence: Box<dyn Persistence>) -> Self {
        Self {
            databases: HashMap::new(),
            persistence,
        }
    }

    /// A store that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::new(Box::new(NoPersistence))
    }

    /// Returns the names of the databases currently held in memory, sorted.
    pub fn database_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.databases.values().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn exists(&self, name: &str) -> bool {
        self.databases.contains_key(&name_key(name)) || self.persistence.exists(name)
    }

    /// Gets a database, loading it from persistence if it is not in memory.
    fn open(&mut self, name: &str) -> Result<&mut Database> {
        let k = name_key(name);
        if !self.databases.contains_key(&k) {
            let database = self
                .persistence
                .load(name)?
                .ok_or_else(|| DbError::UnknownDatabase(name.to_string()))?;
            info!(database = %database.name, "loaded database from storage");
            self.databases.insert(k.clone(), database);
        }
        self.databases
            .get_mut(&k)
            .ok_or_else(|| DbError::UnknownDatabase(name.to_string()))
    }

    fn create_database(&mut self, name: String) -> Result<()> {
        if self.exists(&name) {
            return Err(DbError::DatabaseExists(name));
        }
        let database = Database::new(name);
        self.persistence.save(&database).inspect_err(|e| {
            error!(database = %database.name, error = %e, "failed to save new database");
        })?;
        self.databases.insert(name_key(&database.name), database);
        Ok(())
    }

    fn drop_database(&mut self, name: &str) -> Result<()> {
        if !self.exists(name) {
            return Err(DbError::UnknownDatabase(name.to_string()));
        }
        self.persistence.remove(name).inspect_err(|e| {
            error!(database = %name, error = %e, "failed to remove database");
        })?;
        self.databases.remove(&name_key(name));
        Ok(())
    }

    /// Runs `f` against database `name` and saves the result.
    ///
    /// If the save fails the database is put back the way it was before `f`
    /// ran, so the command fails as a whole.
    fn apply<T, F>(&mut self, name: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>,
    {
        self.open(name)?;
        let Self {
            databases,
            persistence,
        } = self;
        let database = databases
            .get_mut(&name_key(name))
            .ok_or_else(|| DbError::UnknownDatabase(name.to_string()))?;

        if !persistence.is_durable() {
            return f(database);
        }

        let snapshot = database.clone();
        let output = f(database)?;
        if let Err(e) = persistence.save(database) {
            error!(database = %database.name, error = %e, "failed to save database, undoing command");
            *database = snapshot;
            return Err(e);
        }
        Ok(output)
    }
}

/// Per-connection state: the database chosen with `USE`.
#[derive(Debug, Default, Clone)]
pub struct Session {
    current: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The folded name of the current database, if one is selected.
    pub fn current_database(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Parses and executes one command line.
    pub fn run(&mut self, store: &mut Store, line: &str) -> Result<Option<QueryResult>> {
        let command = parse_command(line)?;
        self.execute(store, command)
    }

    /// Executes a parsed command against `store`.
    ///
    /// Returns `Some` for commands that produce a table (SELECT and JOIN) and
    /// `None` for the rest. Every check runs before anything is changed, so a
    /// failing command leaves the store as it was.
    pub fn execute(&mut self, store: &mut Store, command: Command) -> Result<Option<QueryResult>> {
        debug!(?command, "executing");
        match command {
            Command::UseDatabase(name) => {
                store.open(&name)?;
                self.current = Some(name_key(&name));
                Ok(None)
            }
            Command::CreateDatabase(name) => {
                info!(database = %name, "creating database");
                store.create_database(name)?;
                Ok(None)
            }
            Command::DropDatabase(name) => {
                info!(database = %name, "dropping database");
                store.drop_database(&name)?;
                if self.current.as_deref() == Some(name_key(&name).as_str()) {
                    self.current = None;
                }
                Ok(None)
            }
            Command::CreateTable(create) => {
                self.mutate(store, |db| db.create_table(create.name, create.attributes))?;
                Ok(None)
            }
            Command::DropTable(name) => {
                self.mutate(store, |db| db.drop_table(&name))?;
                Ok(None)
            }
            Command::AlterTable(alter) => {
                self.mutate(store, |db| {
                    db.alter_table(&alter.table, alter.action, alter.attribute)
                })?;
                Ok(None)
            }
            Command::Insert(insert) => {
                let id = self.mutate(store, |db| {
                    db.get_table_mut(&insert.table)?.insert(insert.values)
                })?;
                debug!(table = %insert.table, id, "inserted row");
                Ok(None)
            }
            Command::Select(select) => {
                let db = self.current(store)?;
                let table = db.get_table(&select.table)?;
                let columns = match &select.columns {
                    ColumnsSelect::Star => None,
                    ColumnsSelect::ColumnsNames(names) => Some(names.as_slice()),
                };
                let result = table.select(columns, select.where_clause.as_ref())?;
                Ok(Some(result))
            }
            Command::Update(update) => {
                let changed = self.mutate(store, |db| {
                    db.get_table_mut(&update.table)?
                        .update(&update.assignments, &update.where_clause)
                })?;
                debug!(table = %update.table, changed, "updated rows");
                Ok(None)
            }
            Command::Delete(delete) => {
                let removed = self.mutate(store, |db| {
                    db.get_table_mut(&delete.table)?.delete(&delete.where_clause)
                })?;
                debug!(table = %delete.table, removed, "deleted rows");
                Ok(None)
            }
            Command::Join(join) => {
                let db = self.current(store)?;
                Ok(Some(db.join(&join)?))
            }
        }
    }

    fn current<'a>(&self, store: &'a mut Store) -> Result<&'a mut Database> {
        let name = self.current.as_deref().ok_or(DbError::NoDatabaseSelected)?;
        store.open(name)
    }

    /// Runs `f` against the current database, saving it afterwards.
    fn mutate<T, F>(&self, store: &mut Store, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>,
    {
        let name = self.current.as_deref().ok_or(DbError::NoDatabaseSelected)?;
        store.apply(name, f)
    }
}
