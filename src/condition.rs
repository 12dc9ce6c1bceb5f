//! Evaluation of WHERE-clause trees against stored rows.
//!
//! Rows hold text only, so every comparison decides from the literal's kind
//! how the field should be read: as a number, as text or as a boolean word.

use std::cmp::Ordering;

use crate::ast::{ComparisonOp, Condition};
use crate::error::{DbError, Result};
use crate::value::{Value, parse_number};

impl Condition {
    /// Checks that every attribute the condition names exists, using
    /// `resolve` to map a name to its column index.
    pub fn validate<F>(&self, resolve: F) -> Result<()>
    where
        F: Fn(&str) -> Option<usize>,
    {
        for attribute in self.attributes() {
            if resolve(attribute).is_none() {
                return Err(DbError::UnknownAttribute(attribute.to_string()));
            }
        }
        Ok(())
    }

    /// Evaluates the condition against one row.
    ///
    /// `resolve` maps an attribute name to its index in `row`.
    ///
    /// # Returns
    /// * `Ok(true)` - The row satisfies the condition
    /// * `Ok(false)` - The row does not match
    /// * `Err(...)` - The condition names an attribute the table lacks
    pub fn evaluate<F>(&self, row: &[String], resolve: &F) -> Result<bool>
    where
        F: Fn(&str) -> Option<usize>,
    {
        match self {
            Condition::Comparison {
                attribute,
                op,
                value,
            } => {
                let idx = resolve(attribute.as_str())
                    .ok_or_else(|| DbError::UnknownAttribute(attribute.clone()))?;
                Ok(compare_field(&row[idx], *op, value))
            }
            Condition::And(left, right) => {
                if !left.evaluate(row, resolve)? {
                    return Ok(false);
                }
                right.evaluate(row, resolve)
            }
            Condition::Or(left, right) => {
                Ok(left.evaluate(row, resolve)? || right.evaluate(row, resolve)?)
            }
        }
    }
}

/// Compares a stored field with a literal.
pub fn compare_field(field: &str, op: ComparisonOp, literal: &Value) -> bool {
    if op == ComparisonOp::Like {
        return field.contains(literal.to_field().as_str());
    }

    let ordering = match literal {
        Value::Int(_) | Value::Float(_) => match (parse_number(field), literal.as_number()) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => None,
        },
        Value::Text(text) => match (parse_number(field), parse_number(text)) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => Some(field.cmp(&**text)),
        },
        Value::Bool(_) => {
            return equality_only(field.eq_ignore_ascii_case(&literal.to_field()), op);
        }
        Value::Null => return equality_only(field == "NULL", op),
    };

    match (op, ordering) {
        (ComparisonOp::Eq, ord) => ord == Some(Ordering::Equal),
        (ComparisonOp::NotEq, ord) => ord != Some(Ordering::Equal),
        (ComparisonOp::Like, _) | (_, None) => false,
        (ComparisonOp::Gt, Some(ord)) => ord == Ordering::Greater,
        (ComparisonOp::Lt, Some(ord)) => ord == Ordering::Less,
        (ComparisonOp::GtEq, Some(ord)) => ord != Ordering::Less,
        (ComparisonOp::LtEq, Some(ord)) => ord != Ordering::Greater,
    }
}

/// Booleans and NULL only support `==` and `!=`.
fn equality_only(equal: bool, op: ComparisonOp) -> bool {
    match op {
        ComparisonOp::Eq => equal,
        ComparisonOp::NotEq => !equal,
        _ => false,
    }
}
