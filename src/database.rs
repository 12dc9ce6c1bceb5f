use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{AlterAction, Join};
use crate::error::{DbError, Result};
use crate::table::{ID_COLUMN, QueryResult, Table};

/// A named collection of tables.
///
/// Table names are unique ignoring case; the map is keyed by the lower-cased
/// name while each [Table] keeps the spelling it was created with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    tables: HashMap<String, Table>,
}

/// Folds a database, table or attribute name for case-insensitive lookup.
///
/// Only ASCII letters fold, matching `eq_ignore_ascii_case` on attributes.
pub fn name_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Database {
    /// Creates a new, empty database.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: HashMap::default(),
        }
    }

    /// Creates a new table in the database.
    ///
    /// # Errors
    /// Returns an error if a table with the same name already exists or if the
    /// attribute list is invalid.
    pub fn create_table(&mut self, name: String, attributes: Vec<String>) -> Result<()> {
        if self.tables.contains_key(&name_key(&name)) {
            return Err(DbError::TableExists(name));
        }
        let table = Table::new(name.clone(), attributes)?;
        self.tables.insert(name_key(&name), table);
        Ok(())
    }

    /// Removes a table, and every row in it, by name.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        match self.tables.remove(&name_key(name)) {
            Some(_) => Ok(()),
            None => Err(DbError::UnknownTable(name.to_string())),
        }
    }

    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(&name_key(name))
            .ok_or_else(|| DbError::UnknownTable(name.to_string()))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(&name_key(name))
            .ok_or_else(|| DbError::UnknownTable(name.to_string()))
    }

    /// Returns the names of all tables, sorted.
    pub fn list_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.values().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Adds or drops one attribute of a table.
    pub fn alter_table(&mut self, table: &str, action: AlterAction, attribute: String) -> Result<()> {
        let table = self.get_table_mut(table)?;
        match action {
            AlterAction::Add => table.add_attribute(attribute),
            AlterAction::Drop => table.drop_attribute(&attribute),
        }
    }

    /// Joins two tables on equal attribute values.
    ///
    /// The result gets a fresh `id` column numbered from 1, followed by the
    /// remaining columns of the left table and then of the right table. The
    /// identity and join columns of both sides are left out, and a name that
    /// appears on both sides is qualified as `table.attribute`; when that is
    /// still ambiguous (a table joined with itself) later copies get a `_2`,
    /// `_3`, ... suffix. Rows come out in left-table order, then right-table
    /// order.
    pub fn join(&self, join: &Join) -> Result<QueryResult> {
        let left = self.get_table(&join.left_table)?;
        let right = self.get_table(&join.right_table)?;

        let left_on = left
            .attribute_index(&join.left_attribute)
            .ok_or_else(|| DbError::UnknownAttribute(join.left_attribute.clone()))?;
        let right_on = right
            .attribute_index(&join.right_attribute)
            .ok_or_else(|| DbError::UnknownAttribute(join.right_attribute.clone()))?;

        let keep = |table: &Table, on: usize| -> Vec<usize> {
            (1..table.attributes().len()).filter(|&i| i != on).collect()
        };
        let left_cols = keep(left, left_on);
        let right_cols = keep(right, right_on);

        let clashes = |name: &str, other: &Table, other_cols: &[usize]| {
            other_cols
                .iter()
                .any(|&i| other.attributes()[i].eq_ignore_ascii_case(name))
        };
        let header = |table: &Table, i: usize, other: &Table, other_cols: &[usize]| {
            let name = &table.attributes()[i];
            if clashes(name.as_str(), other, other_cols) {
                format!("{}.{}", table.name, name)
            } else {
                name.clone()
            }
        };

        let mut columns = vec![ID_COLUMN.to_string()];
        columns.extend(left_cols.iter().map(|&i| header(left, i, right, &right_cols)));
        columns.extend(right_cols.iter().map(|&i| header(right, i, left, &left_cols)));
        disambiguate(&mut columns);

        let mut rows = Vec::new();
        for l in left.rows() {
            for r in right.rows().iter().filter(|r| r[right_on] == l[left_on]) {
                let mut row = Vec::with_capacity(columns.len());
                row.push((rows.len() + 1).to_string());
                row.extend(left_cols.iter().map(|&i| l[i].clone()));
                row.extend(right_cols.iter().map(|&i| r[i].clone()));
                rows.push(row);
            }
        }

        Ok(QueryResult { columns, rows })
    }

    /// Checks every table's structural invariants.
    pub fn is_consistent(&self) -> bool {
        self.tables
            .iter()
            .all(|(k, t)| *k == name_key(&t.name) && t.is_consistent())
    }
}

/// Suffixes every header that repeats an earlier one.
fn disambiguate(columns: &mut [String]) {
    for i in 1..columns.len() {
        if !columns[..i].iter().any(|c| c.eq_ignore_ascii_case(&columns[i])) {
            continue;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{n}", columns[i]);
            if !columns.iter().any(|c| c.eq_ignore_ascii_case(&candidate)) {
                columns[i] = candidate;
                break;
            }
            n += 1;
        }
    }
}
