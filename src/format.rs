//! Rendering of command outcomes as response text.

use std::fmt::Write;

use crate::error::{DbError, Result};
use crate::table::QueryResult;

pub const OK: &str = "[OK]";
pub const ERROR: &str = "[ERROR]";

/// Formats the outcome of one command.
///
/// ```
/// use linedb::format::format_response;
/// use linedb::QueryResult;
///
/// let result = QueryResult {
///     columns: vec!["id".into(), "name".into()],
///     rows: vec![vec!["1".into(), "Alice".into()]],
/// };
/// assert_eq!(format_response(&Ok(Some(result))), "[OK]\nid\tname\n1\tAlice");
/// assert_eq!(format_response(&Ok(None)), "[OK]");
/// ```
pub fn format_response(outcome: &Result<Option<QueryResult>>) -> String {
    match outcome {
        Ok(None) => OK.to_string(),
        Ok(Some(result)) => format_table(result),
        Err(e) => format_error(e),
    }
}

pub fn format_error(error: &DbError) -> String {
    format!("{ERROR}: {error}")
}

fn format_table(result: &QueryResult) -> String {
    let mut out = String::from(OK);
    out.push('\n');
    out.push_str(&result.columns.join("\t"));
    for row in &result.rows {
        // Writing to a String cannot fail
        let _ = write!(out, "\n{}", row.join("\t"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ok() {
        assert_eq!(format_response(&Ok(None)), "[OK]");
    }

    #[test]
    fn test_header_only() {
        let result = QueryResult {
            columns: vec!["id".into(), "name".into(), "age".into()],
            rows: vec![],
        };
        assert_eq!(format_response(&Ok(Some(result))), "[OK]\nid\tname\tage");
    }

    #[test]
    fn test_rows_in_order() {
        let result = QueryResult {
            columns: vec!["id".into(), "name".into()],
            rows: vec![
                vec!["1".into(), "Alice".into()],
                vec!["2".into(), "".into()],
            ],
        };
        assert_eq!(
            format_response(&Ok(Some(result))),
            "[OK]\nid\tname\n1\tAlice\n2\t"
        );
    }

    #[test]
    fn test_error() {
        let outcome = Err(DbError::UnknownTable("people".into()));
        assert_eq!(format_response(&outcome), "[ERROR]: unknown table 'people'");
    }
}
