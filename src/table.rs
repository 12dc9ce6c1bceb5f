use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ast::Condition;
use crate::error::{DbError, Result};
use crate::value::Value;

/// Name of the system-managed identity column, always at index 0.
pub const ID_COLUMN: &str = "id";

/// A row of text fields; `row[0]` is the identity value.
pub type Row = Vec<String>;

/// The result of a query: ordered headers and ordered rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryResult {
    /// The names of the columns included in the result set.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// A named table of text rows in insertion order.
///
/// Every row has exactly one field per attribute. Identity values start at 1
/// and come from `next_id`, which only ever grows, so a deleted identity is
/// never handed out again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    attributes: Vec<String>,
    rows: Vec<Row>,
    next_id: u64,
}

impl Table {
    /// Creates an empty table with the identity column followed by
    /// `attributes`.
    ///
    /// # Errors
    /// Returns [DbError::AttributeExists] if a name repeats (case-insensitively)
    /// or [DbError::IdentityColumn] if a user attribute is called `id`.
    pub fn new(name: String, attributes: Vec<String>) -> Result<Self> {
        let mut table = Self {
            name,
            attributes: vec![ID_COLUMN.to_string()],
            rows: Vec::new(),
            next_id: 1,
        };
        for attribute in attributes {
            table.check_new_attribute(&attribute)?;
            table.attributes.push(attribute);
        }
        Ok(table)
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Finds an attribute's column index, ignoring case.
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| a.eq_ignore_ascii_case(name))
    }

    fn check_new_attribute(&self, name: &str) -> Result<()> {
        if name.eq_ignore_ascii_case(ID_COLUMN) {
            return Err(DbError::IdentityColumn);
        }
        if self.attribute_index(name).is_some() {
            return Err(DbError::AttributeExists(name.to_string()));
        }
        Ok(())
    }

    /// Resolves a user attribute that may be written to.
    fn writable_index(&self, name: &str) -> Result<usize> {
        match self.attribute_index(name) {
            Some(0) => Err(DbError::IdentityColumn),
            Some(idx) => Ok(idx),
            None => Err(DbError::UnknownAttribute(name.to_string())),
        }
    }

    /// Appends a row and returns its newly assigned identity.
    ///
    /// `values` covers the user attributes only.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<u64> {
        let expected = self.attributes.len() - 1;
        if values.len() != expected {
            return Err(DbError::ValueCount {
                expected,
                found: values.len(),
            });
        }

        let id = self.next_id;
        let mut row = Vec::with_capacity(self.attributes.len());
        row.push(id.to_string());
        row.extend(values.iter().map(Value::to_field));

        self.rows.push(row);
        self.next_id += 1;
        Ok(id)
    }

    /// Builds a selection mask with one bit per row, set where the row
    /// satisfies `condition` (or for every row when there is none).
    ///
    /// The condition is validated first, so an unknown attribute fails even
    /// on an empty table.
    pub fn matching(&self, condition: Option<&Condition>) -> Result<BitVec> {
        let Some(condition) = condition else {
            return Ok(bitvec![1; self.rows.len()]);
        };

        let resolve = |name: &str| self.attribute_index(name);
        condition.validate(resolve)?;

        let mut mask = BitVec::with_capacity(self.rows.len());
        for row in &self.rows {
            mask.push(condition.evaluate(row, &resolve)?);
        }
        Ok(mask)
    }

    /// Returns the rows matching `condition`, projected onto `columns`
    /// (all columns when `None`), in insertion order.
    pub fn select(
        &self,
        columns: Option<&[String]>,
        condition: Option<&Condition>,
    ) -> Result<QueryResult> {
        // Resolve which columns need to be projected
        let indices: Vec<usize> = match columns {
            None => (0..self.attributes.len()).collect(),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.attribute_index(name)
                        .ok_or_else(|| DbError::UnknownAttribute(name.clone()))
                })
                .collect::<Result<_>>()?,
        };

        let mask = self.matching(condition)?;
        let rows: Vec<Row> = mask
            .iter_ones()
            .map(|i| indices.iter().map(|&c| self.rows[i][c].clone()).collect::<Row>())
            .collect();

        Ok(QueryResult {
            columns: indices.iter().map(|&c| self.attributes[c].clone()).collect(),
            rows,
        })
    }

    /// Applies `assignments` to every row matching `condition` and returns the
    /// number of rows changed.
    ///
    /// All targets and the condition are checked before any row is touched,
    /// so a failing update leaves the table as it was.
    pub fn update(&mut self, assignments: &[(String, Value)], condition: &Condition) -> Result<usize> {
        let mut targets = Vec::with_capacity(assignments.len());
        for (name, value) in assignments {
            targets.push((self.writable_index(name)?, value.to_field()));
        }

        let mask = self.matching(Some(condition))?;
        for i in mask.iter_ones() {
            for (idx, field) in &targets {
                self.rows[i][*idx].clone_from(field);
            }
        }
        Ok(mask.count_ones())
    }

    /// Removes every row matching `condition` and returns how many went.
    pub fn delete(&mut self, condition: &Condition) -> Result<usize> {
        let mask = self.matching(Some(condition))?;
        let removed = mask.count_ones();

        let mut bits = mask.iter().by_vals();
        self.rows.retain(|_| !bits.next().unwrap_or(false));
        Ok(removed)
    }

    /// Adds a column, filling existing rows with an empty field.
    pub fn add_attribute(&mut self, name: String) -> Result<()> {
        self.check_new_attribute(&name)?;
        self.attributes.push(name);
        for row in &mut self.rows {
            row.push(String::new());
        }
        Ok(())
    }

    /// Removes a column and its field from every row.
    pub fn drop_attribute(&mut self, name: &str) -> Result<()> {
        let idx = self.writable_index(name)?;
        self.attributes.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        Ok(())
    }

    /// Checks the structural invariants a loaded table must satisfy.
    pub fn is_consistent(&self) -> bool {
        let width = self.attributes.len();
        let mut last_id = 0;
        self.attributes
            .first()
            .is_some_and(|a| a.eq_ignore_ascii_case(ID_COLUMN))
            && self.rows.iter().all(|row| {
                let Some(id) = row.first().and_then(|f| f.parse::<u64>().ok()) else {
                    return false;
                };
                let ordered = id > last_id && id < self.next_id;
                last_id = id;
                row.len() == width && ordered
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ComparisonOp;

    fn people() -> Table {
        let mut table = Table::new("people".into(), vec!["name".into(), "age".into()]).unwrap();
        table
            .insert(vec![Value::Text("Alice".into()), Value::int(30)])
            .unwrap();
        table
            .insert(vec![Value::Text("Bob".into()), Value::int(17)])
            .unwrap();
        table
            .insert(vec![Value::Text("Charlie".into()), Value::int(25)])
            .unwrap();
        table
    }

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|s| s.to_string()).collect()
    }

    fn age_over(n: i64) -> Condition {
        Condition::comparison("age", ComparisonOp::Gt, Value::int(n))
    }

    #[test]
    fn test_table_creation() {
        let table = Table::new("people".into(), vec!["name".into()]).unwrap();
        assert_eq!(table.attributes(), &["id", "name"]);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let err = Table::new("t".into(), vec!["name".into(), "NAME".into()]);
        assert!(matches!(err, Err(DbError::AttributeExists(_))));
        let err = Table::new("t".into(), vec!["Id".into()]);
        assert!(matches!(err, Err(DbError::IdentityColumn)));
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let table = people();
        assert_eq!(table.rows()[0], row(&["1", "Alice", "30"]));
        assert_eq!(table.rows()[1], row(&["2", "Bob", "17"]));
        assert_eq!(table.rows()[2], row(&["3", "Charlie", "25"]));
    }

    #[test]
    fn test_ids_never_reused_after_delete() {
        let mut table = people();
        let removed = table
            .delete(&Condition::comparison("id", ComparisonOp::GtEq, Value::int(2)))
            .unwrap();
        assert_eq!(removed, 2);

        let id = table
            .insert(vec![Value::Text("Dora".into()), Value::int(40)])
            .unwrap();
        assert_eq!(id, 4);
    }

    #[test]
    fn test_column_count_mismatch() {
        let mut table = people();
        let result = table.insert(vec![Value::Text("Eve".into())]);
        assert!(matches!(
            result,
            Err(DbError::ValueCount {
                expected: 2,
                found: 1
            })
        ));
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_select_star_and_projection() {
        let table = people();
        let all = table.select(None, None).unwrap();
        assert_eq!(all.columns, vec!["id", "name", "age"]);
        assert_eq!(all.rows.len(), 3);

        let cols = vec!["AGE".to_string(), "name".to_string()];
        let subset = table.select(Some(cols.as_slice()), Some(&age_over(18))).unwrap();
        assert_eq!(subset.columns, vec!["age", "name"]);
        assert_eq!(subset.rows, vec![row(&["30", "Alice"]), row(&["25", "Charlie"])]);
    }

    #[test]
    fn test_select_unknown_column() {
        let table = people();
        let cols = vec!["salary".to_string()];
        assert!(matches!(
            table.select(Some(cols.as_slice()), None),
            Err(DbError::UnknownAttribute(_))
        ));
    }

    #[test]
    fn test_matching_validates_on_empty_table() {
        let table = Table::new("t".into(), vec!["a".into()]).unwrap();
        let cond = Condition::comparison("b", ComparisonOp::Eq, Value::int(1));
        assert!(table.matching(Some(&cond)).is_err());
    }

    #[test]
    fn test_update_keeps_identity() {
        let mut table = people();
        let changed = table
            .update(
                &[("age".into(), Value::Text("31".into()))],
                &Condition::comparison("name", ComparisonOp::Eq, Value::Text("Alice".into())),
            )
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(table.rows()[0], row(&["1", "Alice", "31"]));
    }

    #[test]
    fn test_update_no_match_is_noop() {
        let mut table = people();
        let before = table.clone();
        assert_eq!(table.update(&[("age".into(), Value::int(1))], &age_over(100)).unwrap(), 0);
        assert_eq!(table, before);
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let mut table = people();
        let before = table.clone();

        let result = table.update(
            &[
                ("age".into(), Value::int(99)),
                ("salary".into(), Value::int(1)),
            ],
            &age_over(0),
        );
        assert!(matches!(result, Err(DbError::UnknownAttribute(_))));
        assert_eq!(table, before);

        let result = table.update(&[("id".into(), Value::int(7))], &age_over(0));
        assert!(matches!(result, Err(DbError::IdentityColumn)));
        assert_eq!(table, before);
    }

    #[test]
    fn test_delete_preserves_order() {
        let mut table = people();
        table.delete(&age_over(26)).unwrap();
        assert_eq!(
            table.rows(),
            &[row(&["2", "Bob", "17"]), row(&["3", "Charlie", "25"])]
        );
    }

    #[test]
    fn test_add_and_drop_attribute() {
        let mut table = people();
        table.add_attribute("email".into()).unwrap();
        assert_eq!(table.attributes(), &["id", "name", "age", "email"]);
        assert_eq!(table.rows()[0], row(&["1", "Alice", "30", ""]));

        table.drop_attribute("AGE").unwrap();
        assert_eq!(table.attributes(), &["id", "name", "email"]);
        assert_eq!(table.rows()[2], row(&["3", "Charlie", ""]));
        assert!(table.is_consistent());
    }

    #[test]
    fn test_alter_errors() {
        let mut table = people();
        assert!(matches!(
            table.add_attribute("Name".into()),
            Err(DbError::AttributeExists(_))
        ));
        assert!(matches!(table.drop_attribute("id"), Err(DbError::IdentityColumn)));
        assert!(matches!(
            table.drop_attribute("nope"),
            Err(DbError::UnknownAttribute(_))
        ));
    }

    #[test]
    fn test_is_consistent_detects_bad_rows() {
        let mut table = people();
        assert!(table.is_consistent());
        table.rows[1].pop();
        assert!(!table.is_consistent());
    }
}
