use crate::error::{DbError, Result};

/// Words reserved by the command language, matched case-insensitively.
pub const KEYWORDS: &[&str] = &[
    "USE", "CREATE", "DROP", "ALTER", "INSERT", "SELECT", "UPDATE", "DELETE", "JOIN", "INTO",
    "VALUES", "FROM", "WHERE", "SET", "ADD", "ON", "AND", "OR", "LIKE", "TABLE", "DATABASE",
    "NULL",
];

/// The category of a [Token].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A reserved word, stored upper-cased.
    Keyword,
    /// A database, table or attribute name.
    Identifier,
    /// The content of a quoted span, without its quotes.
    StringLiteral,
    IntLiteral,
    FloatLiteral,
    /// Punctuation and comparison operators.
    Symbol,
    /// `TRUE` or `FALSE`, stored upper-cased.
    BooleanLiteral,
}

/// The smallest meaningful unit of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Returns `true` if this is the keyword `word` (given upper-case).
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == word
    }

    /// Returns `true` if this is the symbol `symbol`.
    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }
}

/// A lexical scanner that converts a raw command string into a sequence of [Token]s.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns its tokens in order.
    ///
    /// # Errors
    /// Returns [DbError::Lex] on an unterminated string literal, a control
    /// character inside a literal, a malformed number or any character the
    /// language does not use.
    ///
    /// # Example
    /// ```
    /// # use linedb::tokenizer::{Tokenizer, TokenKind};
    /// let tokens = Tokenizer::new("SELECT * FROM people;").tokenize().unwrap();
    /// assert_eq!(tokens.len(), 5);
    /// assert_eq!(tokens[0].kind, TokenKind::Keyword);
    /// assert_eq!(tokens[4].text, ";");
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token> {
        let ch = self.current_char();

        match ch {
            '(' | ')' | ',' | ';' | '*' => {
                self.advance();
                Ok(Token::new(TokenKind::Symbol, ch))
            }
            '=' | '>' | '<' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Symbol, format!("{ch}=")))
                } else {
                    Ok(Token::new(TokenKind::Symbol, ch))
                }
            }
            '!' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Symbol, "!="))
                } else {
                    Err(DbError::Lex("expected '=' after '!'".into()))
                }
            }
            '\'' | '"' => self.read_string(ch),
            '+' | '-' if self.peek_next().is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                let mut token = self.read_number()?;
                if token.kind == TokenKind::Identifier {
                    return Err(DbError::Lex(format!("malformed number '{ch}{}'", token.text)));
                }
                token.text.insert(0, ch);
                Ok(token)
            }
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_word()),
            _ => Err(DbError::Lex(format!("unrecognized character {ch:?}"))),
        }
    }

    // --- Navigation Helpers ---

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool, out: &mut String) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.advance();
        }
    }

    // --- Extraction Logic ---

    /// Reads a word and classifies it as keyword, boolean literal or identifier.
    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        self.take_while(|c| c.is_alphanumeric() || c == '_', &mut word);

        let upper = word.to_uppercase();
        if upper == "TRUE" || upper == "FALSE" {
            Token::new(TokenKind::BooleanLiteral, upper)
        } else if KEYWORDS.contains(&upper.as_str()) {
            Token::new(TokenKind::Keyword, upper)
        } else {
            Token::new(TokenKind::Identifier, word)
        }
    }

    /// Reads an unsigned numeric literal.
    ///
    /// Digits followed by letters form an identifier such as `2nd`, since names
    /// are plain alphanumeric runs.
    fn read_number(&mut self) -> Result<Token> {
        let mut number = String::new();
        self.take_while(|c| c.is_ascii_digit(), &mut number);

        if self.peek() == Some('.') {
            if !self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                return Err(DbError::Lex(format!("malformed number '{number}.'")));
            }
            number.push('.');
            self.advance();
            self.take_while(|c| c.is_ascii_digit(), &mut number);

            if self
                .peek()
                .is_some_and(|c| c == '.' || c.is_alphanumeric() || c == '_')
            {
                return Err(DbError::Lex(format!("malformed number '{number}'")));
            }
            return Ok(Token::new(TokenKind::FloatLiteral, number));
        }

        if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            self.take_while(|c| c.is_alphanumeric() || c == '_', &mut number);
            return Ok(Token::new(TokenKind::Identifier, number));
        }

        Ok(Token::new(TokenKind::IntLiteral, number))
    }

    /// Reads a string literal enclosed in `quote`.
    fn read_string(&mut self, quote: char) -> Result<Token> {
        self.advance(); // opening quote

        let mut string = String::new();
        while !self.is_at_end() && self.current_char() != quote {
            let c = self.current_char();
            if c.is_control() {
                return Err(DbError::Lex(format!(
                    "control character {c:?} in string literal"
                )));
            }
            string.push(c);
            self.advance();
        }

        if self.is_at_end() {
            return Err(DbError::Lex("unterminated string literal".into()));
        }
        self.advance(); // closing quote

        Ok(Token::new(TokenKind::StringLiteral, string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Tokenizer::new(input).tokenize().unwrap()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_simple() {
        let tokens = lex("CREATE TABLE people;");
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Keyword, "CREATE"),
                Token::new(TokenKind::Keyword, "TABLE"),
                Token::new(TokenKind::Identifier, "people"),
                Token::new(TokenKind::Symbol, ";"),
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive_identifiers_preserved() {
        let tokens = lex("select Name frOm People");
        assert_eq!(tokens[0], Token::new(TokenKind::Keyword, "SELECT"));
        assert_eq!(tokens[1], Token::new(TokenKind::Identifier, "Name"));
        assert_eq!(tokens[2], Token::new(TokenKind::Keyword, "FROM"));
        assert_eq!(tokens[3], Token::new(TokenKind::Identifier, "People"));
    }

    #[test]
    fn test_tokenize_with_parens() {
        assert_eq!(
            lex("(name, age)"),
            vec![
                Token::new(TokenKind::Symbol, "("),
                Token::new(TokenKind::Identifier, "name"),
                Token::new(TokenKind::Symbol, ","),
                Token::new(TokenKind::Identifier, "age"),
                Token::new(TokenKind::Symbol, ")"),
            ]
        );
    }

    #[test]
    fn test_compound_symbols() {
        let texts: Vec<String> = lex("== != >= <= > < = *")
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["==", "!=", ">=", "<=", ">", "<", "=", "*"]);
    }

    #[test]
    fn test_symbols_without_whitespace() {
        let texts: Vec<String> = lex("age>=20;").into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["age", ">=", "20", ";"]);
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            lex("42 -7 +3 1.5 -0.25"),
            vec![
                Token::new(TokenKind::IntLiteral, "42"),
                Token::new(TokenKind::IntLiteral, "-7"),
                Token::new(TokenKind::IntLiteral, "+3"),
                Token::new(TokenKind::FloatLiteral, "1.5"),
                Token::new(TokenKind::FloatLiteral, "-0.25"),
            ]
        );
    }

    #[test]
    fn test_digit_led_identifier() {
        assert_eq!(lex("2nd"), vec![Token::new(TokenKind::Identifier, "2nd")]);
    }

    #[test]
    fn test_malformed_numbers() {
        assert!(Tokenizer::new("12.").tokenize().is_err());
        assert!(Tokenizer::new("1.2.3").tokenize().is_err());
        assert!(Tokenizer::new("-2nd").tokenize().is_err());
    }

    #[test]
    fn test_tokenize_strings() {
        assert_eq!(
            lex("'Alice' \"Bob Dylan\" ''"),
            vec![
                Token::new(TokenKind::StringLiteral, "Alice"),
                Token::new(TokenKind::StringLiteral, "Bob Dylan"),
                Token::new(TokenKind::StringLiteral, ""),
            ]
        );
    }

    #[test]
    fn test_string_keeps_keywords_and_symbols() {
        assert_eq!(
            lex("'select * ; from'"),
            vec![Token::new(TokenKind::StringLiteral, "select * ; from")]
        );
    }

    #[test]
    fn test_booleans() {
        assert_eq!(
            kinds("TRUE false"),
            vec![TokenKind::BooleanLiteral, TokenKind::BooleanLiteral]
        );
        assert_eq!(lex("false")[0].text, "FALSE");
    }

    #[test]
    fn test_unterminated_string() {
        let result = Tokenizer::new("'hello").tokenize();
        assert!(matches!(result, Err(DbError::Lex(_))));
    }

    #[test]
    fn test_control_character_in_string() {
        assert!(Tokenizer::new("'a\u{4}b'").tokenize().is_err());
        assert!(Tokenizer::new("'a\tb'").tokenize().is_err());
    }

    #[test]
    fn test_unrecognized_character() {
        assert!(Tokenizer::new("SELECT # FROM t;").tokenize().is_err());
        assert!(Tokenizer::new("a ! b").tokenize().is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(lex("   ").is_empty());
    }
}
