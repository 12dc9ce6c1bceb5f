//! Pluggable storage for databases.
//!
//! A [Persistence] implementation is asked to load a database the first time
//! a session uses it and to save a database after every command that changed
//! it. A command whose save fails is undone in memory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::database::{Database, name_key};
use crate::error::Result;

pub trait Persistence: Send {
    /// Returns `true` if a database with this name is stored.
    fn exists(&self, name: &str) -> bool;

    /// Loads a stored database, or `None` if there is none under `name`.
    fn load(&self, name: &str) -> Result<Option<Database>>;

    /// Stores the current state of `database`, replacing any previous copy.
    fn save(&self, database: &Database) -> Result<()>;

    /// Deletes a stored database. Removing a missing database is not an error.
    fn remove(&self, name: &str) -> Result<()>;

    /// Returns `false` when `save` keeps nothing and so can never fail.
    fn is_durable(&self) -> bool {
        true
    }
}

/// Keeps nothing; every database lives only as long as the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPersistence;

impl Persistence for NoPersistence {
    fn exists(&self, _name: &str) -> bool {
        false
    }

    fn load(&self, _name: &str) -> Result<Option<Database>> {
        Ok(None)
    }

    fn save(&self, _database: &Database) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}

/// Stores each database as one JSON document, `<root>/<name>.json`, with the
/// name folded by [name_key].
#[derive(Debug, Clone)]
pub struct JsonDirectory {
    root: PathBuf,
}

impl JsonDirectory {
    /// Uses `root` as the storage folder, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name_key(name)))
    }
}

impl Persistence for JsonDirectory {
    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn load(&self, name: &str) -> Result<Option<Database>> {
        let path = self.path(name);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let database: Database = serde_json::from_str(&contents)?;
        if !database.is_consistent() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} does not hold a valid database", path.display()),
            )
            .into());
        }

        debug!(path = %path.display(), "loaded database");
        Ok(Some(database))
    }

    fn save(&self, database: &Database) -> Result<()> {
        let path = self.path(&database.name);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, serde_json::to_vec_pretty(database)?)?;
        fs::rename(&tmp, &path)?;

        debug!(path = %path.display(), "saved database");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
