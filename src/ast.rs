use crate::Value;

/// One fully parsed command, one per client request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    UseDatabase(String),
    CreateDatabase(String),
    CreateTable(CreateTable),
    DropDatabase(String),
    DropTable(String),
    AlterTable(AlterTable),
    Insert(Insert),
    Select(Select),
    Update(Update),
    Delete(Delete),
    Join(Join),
}

impl Command {
    /// Returns `true` if executing the command may change stored data.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Command::UseDatabase(_) | Command::Select(_) | Command::Join(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    /// User attributes, without the identity column.
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterAction {
    Add,
    Drop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub table: String,
    pub action: AlterAction,
    pub attribute: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnsSelect {
    Star,
    ColumnsNames(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub columns: ColumnsSelect,
    pub table: String,
    pub where_clause: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, Value)>,
    pub where_clause: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub where_clause: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left_table: String,
    pub right_table: String,
    pub left_attribute: String,
    pub right_attribute: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    Like,
}

impl ComparisonOp {
    /// Maps the operator's source text to the operator.
    pub fn from_symbol(text: &str) -> Option<Self> {
        Some(match text {
            "==" => Self::Eq,
            "!=" => Self::NotEq,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::GtEq,
            "<=" => Self::LtEq,
            "LIKE" => Self::Like,
            _ => return None,
        })
    }
}

/// A WHERE clause.
///
/// AND and OR nest strictly left to right; grouping only comes from explicit
/// parentheses in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Comparison {
        attribute: String,
        op: ComparisonOp,
        value: Value,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    pub fn comparison(attribute: impl Into<String>, op: ComparisonOp, value: Value) -> Self {
        Self::Comparison {
            attribute: attribute.into(),
            op,
            value,
        }
    }

    pub fn and(left: Condition, right: Condition) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Condition, right: Condition) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Every attribute name the condition refers to, left to right.
    pub fn attributes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Comparison { attribute, .. } => out.push(attribute),
            Self::And(l, r) | Self::Or(l, r) => {
                l.collect_attributes(out);
                r.collect_attributes(out);
            }
        }
    }
}
