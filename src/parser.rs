use crate::ast::*;
use crate::error::{DbError, Result};
use crate::tokenizer::{Token, TokenKind};
use crate::Value;

/// Recursive-descent parser: one production per command, one token of lookahead.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses exactly one `;`-terminated command.
    ///
    /// # Errors
    /// Returns [DbError::Parse] on an unknown command keyword, a missing clause,
    /// a malformed list, unbalanced parentheses, a missing terminator or any
    /// token after the terminator.
    pub fn parse(&mut self) -> Result<Command> {
        let keyword = match self.current_token() {
            Some(t) if t.kind == TokenKind::Keyword => t.text.clone(),
            Some(t) => return Err(DbError::Parse(format!("unknown command '{}'", t.text))),
            None => return Err(DbError::Parse("empty command".into())),
        };

        let command = match keyword.as_str() {
            "USE" => self.parse_use(),
            "CREATE" => self.parse_create(),
            "DROP" => self.parse_drop(),
            "ALTER" => self.parse_alter(),
            "INSERT" => self.parse_insert(),
            "SELECT" => self.parse_select(),
            "UPDATE" => self.parse_update(),
            "DELETE" => self.parse_delete(),
            "JOIN" => self.parse_join(),
            other => Err(DbError::Parse(format!("unknown command '{other}'"))),
        }?;

        self.consume_symbol(";")?;

        // Check we are at the end of the command
        if let Some(token) = self.current_token() {
            return Err(DbError::Parse(format!(
                "unexpected '{}' after ';', send one command at a time",
                token.text
            )));
        }

        Ok(command)
    }

    // helpers
    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn describe_current(&self) -> String {
        match self.current_token() {
            Some(t) => format!("'{}'", t.text),
            None => "end of command".into(),
        }
    }

    fn check_keyword(&self, word: &str) -> bool {
        self.current_token().is_some_and(|t| t.is_keyword(word))
    }

    fn check_symbol(&self, symbol: &str) -> bool {
        self.current_token().is_some_and(|t| t.is_symbol(symbol))
    }

    fn consume_keyword(&mut self, word: &str) -> Result<()> {
        if self.check_keyword(word) {
            self.advance();
            Ok(())
        } else {
            Err(DbError::Parse(format!(
                "expected {word}, found {}",
                self.describe_current()
            )))
        }
    }

    fn consume_symbol(&mut self, symbol: &str) -> Result<()> {
        if self.check_symbol(symbol) {
            self.advance();
            Ok(())
        } else {
            Err(DbError::Parse(format!(
                "expected '{symbol}', found {}",
                self.describe_current()
            )))
        }
    }

    fn consume_ident(&mut self, what: &str) -> Result<String> {
        match self.current_token() {
            Some(t) if t.kind == TokenKind::Identifier => {
                let name = t.text.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(DbError::Parse(format!(
                "expected {what} name, found {}",
                self.describe_current()
            ))),
        }
    }

    fn consume_value(&mut self) -> Result<Value> {
        let token = self
            .current_token()
            .ok_or_else(|| DbError::Parse("expected a value, found end of command".into()))?;

        let value = match token.kind {
            TokenKind::StringLiteral => Value::Text(token.text.as_str().into()),
            TokenKind::BooleanLiteral => Value::Bool(token.text == "TRUE"),
            TokenKind::IntLiteral => Value::Int(token.text.as_str().into()),
            TokenKind::FloatLiteral => Value::Float(token.text.as_str().into()),
            TokenKind::Keyword if token.text == "NULL" => Value::Null,
            _ => {
                return Err(DbError::Parse(format!(
                    "expected a value, found '{}'",
                    token.text
                )));
            }
        };
        self.advance();
        Ok(value)
    }

    /// Parses `item {, item}`; the list is never empty.
    fn comma_list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let mut items = vec![item(self)?];
        while self.check_symbol(",") {
            self.advance();
            items.push(item(self)?);
        }
        Ok(items)
    }

    // --- Commands ---

    fn parse_use(&mut self) -> Result<Command> {
        self.consume_keyword("USE")?;
        Ok(Command::UseDatabase(self.consume_ident("database")?))
    }

    fn parse_create(&mut self) -> Result<Command> {
        self.consume_keyword("CREATE")?;
        if self.check_keyword("DATABASE") {
            self.advance();
            return Ok(Command::CreateDatabase(self.consume_ident("database")?));
        }

        self.consume_keyword("TABLE")
            .map_err(|_| DbError::Parse("expected DATABASE or TABLE after CREATE".into()))?;
        let name = self.consume_ident("table")?;

        let mut attributes = vec![];
        if self.check_symbol("(") {
            self.advance();
            attributes = self.comma_list(|p| p.consume_ident("attribute"))?;
            self.consume_symbol(")")?;
        }
        Ok(Command::CreateTable(CreateTable { name, attributes }))
    }

    fn parse_drop(&mut self) -> Result<Command> {
        self.consume_keyword("DROP")?;
        if self.check_keyword("DATABASE") {
            self.advance();
            Ok(Command::DropDatabase(self.consume_ident("database")?))
        } else if self.check_keyword("TABLE") {
            self.advance();
            Ok(Command::DropTable(self.consume_ident("table")?))
        } else {
            Err(DbError::Parse(format!(
                "expected DATABASE or TABLE after DROP, found {}",
                self.describe_current()
            )))
        }
    }

    fn parse_alter(&mut self) -> Result<Command> {
        self.consume_keyword("ALTER")?;
        self.consume_keyword("TABLE")?;
        let table = self.consume_ident("table")?;

        let action = if self.check_keyword("ADD") {
            AlterAction::Add
        } else if self.check_keyword("DROP") {
            AlterAction::Drop
        } else {
            return Err(DbError::Parse(format!(
                "expected ADD or DROP, found {}",
                self.describe_current()
            )));
        };
        self.advance();

        let attribute = self.consume_ident("attribute")?;
        Ok(Command::AlterTable(AlterTable {
            table,
            action,
            attribute,
        }))
    }

    fn parse_insert(&mut self) -> Result<Command> {
        self.consume_keyword("INSERT")?;
        self.consume_keyword("INTO")?;
        let table = self.consume_ident("table")?;
        self.consume_keyword("VALUES")?;
        self.consume_symbol("(")?;
        let values = self.comma_list(Self::consume_value)?;
        self.consume_symbol(")")?;
        Ok(Command::Insert(Insert { table, values }))
    }

    fn parse_select(&mut self) -> Result<Command> {
        self.consume_keyword("SELECT")?;

        let columns = if self.check_symbol("*") {
            self.advance();
            ColumnsSelect::Star
        } else {
            ColumnsSelect::ColumnsNames(self.comma_list(|p| p.consume_ident("attribute"))?)
        };

        self.consume_keyword("FROM")?;
        let table = self.consume_ident("table")?;

        let where_clause = if self.check_keyword("WHERE") {
            self.advance();
            Some(self.parse_condition()?)
        } else {
            None
        };

        Ok(Command::Select(Select {
            columns,
            table,
            where_clause,
        }))
    }

    fn parse_update(&mut self) -> Result<Command> {
        self.consume_keyword("UPDATE")?;
        let table = self.consume_ident("table")?;
        self.consume_keyword("SET")?;
        let assignments = self.comma_list(|p| {
            let attribute = p.consume_ident("attribute")?;
            p.consume_symbol("=")?;
            Ok((attribute, p.consume_value()?))
        })?;
        self.consume_keyword("WHERE")?;
        let where_clause = self.parse_condition()?;

        Ok(Command::Update(Update {
            table,
            assignments,
            where_clause,
        }))
    }

    fn parse_delete(&mut self) -> Result<Command> {
        self.consume_keyword("DELETE")?;
        self.consume_keyword("FROM")?;
        let table = self.consume_ident("table")?;
        self.consume_keyword("WHERE")?;
        let where_clause = self.parse_condition()?;
        Ok(Command::Delete(Delete {
            table,
            where_clause,
        }))
    }

    fn parse_join(&mut self) -> Result<Command> {
        self.consume_keyword("JOIN")?;
        let left_table = self.consume_ident("table")?;
        self.consume_keyword("AND")?;
        let right_table = self.consume_ident("table")?;
        self.consume_keyword("ON")?;
        let left_attribute = self.consume_ident("attribute")?;
        self.consume_keyword("AND")?;
        let right_attribute = self.consume_ident("attribute")?;
        Ok(Command::Join(Join {
            left_table,
            right_table,
            left_attribute,
            right_attribute,
        }))
    }

    // --- Conditions ---

    /// `term { (AND | OR) term }`, folded left to right without precedence.
    fn parse_condition(&mut self) -> Result<Condition> {
        let mut left = self.parse_condition_term()?;
        loop {
            if self.check_keyword("AND") {
                self.advance();
                left = Condition::and(left, self.parse_condition_term()?);
            } else if self.check_keyword("OR") {
                self.advance();
                left = Condition::or(left, self.parse_condition_term()?);
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_condition_term(&mut self) -> Result<Condition> {
        if self.check_symbol("(") {
            self.advance();
            let inner = self.parse_condition()?;
            self.consume_symbol(")")
                .map_err(|_| DbError::Parse("unbalanced parentheses in condition".into()))?;
            return Ok(inner);
        }

        let attribute = self.consume_ident("attribute")?;
        let op = self
            .current_token()
            .filter(|t| t.kind == TokenKind::Symbol || t.is_keyword("LIKE"))
            .and_then(|t| ComparisonOp::from_symbol(&t.text))
            .ok_or_else(|| {
                DbError::Parse(format!(
                    "expected a comparator after '{attribute}', found {}",
                    self.describe_current()
                ))
            })?;
        self.advance();
        let value = self.consume_value()?;

        Ok(Condition::Comparison {
            attribute,
            op,
            value,
        })
    }
}

/// Tokenizes and parses one command.
pub fn parse_command(sql: &str) -> Result<Command> {
    let tokens = crate::tokenizer::Tokenizer::new(sql).tokenize()?;
    Parser::new(tokens).parse()
}
