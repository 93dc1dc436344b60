use std::fmt;

use super::model::SortSpec;
use crate::catalog::Field;

/// Comparison applied to one storage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Case-insensitive substring match.
    ILike,
    Eq,
    Gt,
    Lt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Number(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(text) => f.write_str(text),
            Literal::Number(number) => write!(f, "{number}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: Field,
    pub comparison: Comparison,
    pub value: Literal,
}

impl Clause {
    pub fn new(field: Field, comparison: Comparison, value: Literal) -> Self {
        Self {
            field,
            comparison,
            value,
        }
    }
}

/// Top-level filters are combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Clause(Clause),
    AnyOf(Vec<Clause>),
    Not(Clause),
}

/// Backend-agnostic description of one read: predicate list, sort and window.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub filters: Vec<Filter>,
    pub sort: SortSpec,
    pub offset: u64,
    pub limit: u64,
}

impl QueryDescriptor {
    pub fn is_filtered(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Same predicate and sort over a different row window.
    pub fn with_window(&self, offset: u64, limit: u64) -> Self {
        Self {
            filters: self.filters.clone(),
            sort: self.sort,
            offset,
            limit,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} filter(s), sort {} {:?}, offset {}, limit {}",
            self.filters.len(),
            self.sort.field,
            self.sort.direction,
            self.offset,
            self.limit
        )
    }
}
