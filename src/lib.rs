pub mod ast;
pub mod condition;
pub mod database;
pub mod error;
pub mod executor;
pub mod format;
pub mod parser;
pub mod persistence;
pub mod server;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use ast::{Command, Condition};
pub use database::Database;
pub use error::{DbError, Result};
pub use executor::{Session, Store};
pub use format::format_response;
pub use parser::parse_command;
pub use persistence::{JsonDirectory, NoPersistence, Persistence};
pub use table::{QueryResult, Table};
pub use value::Value;
