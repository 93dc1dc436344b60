use std::{fmt, str::FromStr};

use crate::catalog::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Contains,
    Equals,
    GreaterThan,
    LessThan,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Contains => "~",
            Operator::Equals => "=",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Operator::Contains => "Chứa",
            Operator::Equals => "Bằng",
            Operator::GreaterThan => "Lớn hơn",
            Operator::LessThan => "Nhỏ hơn",
        }
    }
}

/// One user-entered filter clause. The value is kept exactly as typed; the
/// builder decides whether it is usable.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCondition {
    pub field: Field,
    pub operator: Operator,
    pub value: String,
}

impl SearchCondition {
    pub fn new(field: Field, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for SearchCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:?}",
            self.field.key(),
            self.operator.symbol(),
            self.value
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl FromStr for Logic {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(Logic::And),
            "or" => Ok(Logic::Or),
            other => Err(format!("expected 'and' or 'or', got '{other}'")),
        }
    }
}

/// Free-text term plus include/exclude conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchConfiguration {
    pub term: String,
    pub include: Vec<SearchCondition>,
    pub include_logic: Logic,
    pub exclude: Vec<SearchCondition>,
}

impl SearchConfiguration {
    pub fn with_term(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Self::default()
        }
    }

    /// True when nothing would filter the catalog.
    pub fn is_empty(&self) -> bool {
        self.term.trim().is_empty() && self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn has_conditions(&self) -> bool {
        !self.include.is_empty() || !self.exclude.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: Field,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: Field::Id,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortSpec {
    pub fn new(field: Field, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Clicking the same column while ascending flips to descending; anything
    /// else sorts the clicked column ascending.
    pub fn toggled(self, field: Field) -> Self {
        let direction = if self.field == field && self.direction == SortDirection::Ascending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        Self { field, direction }
    }
}

impl FromStr for SortSpec {
    type Err = String;

    /// `FIELD` or `FIELD:asc` / `FIELD:desc`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match raw.split_once(':') {
            Some((field, dir)) => (field, dir.trim()),
            None => (raw, "asc"),
        };
        let field = field.parse::<Field>().map_err(|err| err.to_string())?;
        let direction = match direction.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => SortDirection::Ascending,
            "desc" | "descending" => SortDirection::Descending,
            other => return Err(format!("unknown sort direction '{other}'")),
        };
        Ok(Self { field, direction })
    }
}

/// Rows per page. Only a few sizes are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(u32);

impl PageSize {
    pub const CHOICES: [u32; 3] = [20, 50, 100];

    pub fn new(size: u32) -> Option<Self> {
        Self::CHOICES.contains(&size).then_some(Self(size))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        let idx = Self::CHOICES.iter().position(|c| *c == self.0).unwrap_or(0);
        Self(Self::CHOICES[(idx + 1) % Self::CHOICES.len()])
    }

    pub fn previous(self) -> Self {
        let idx = Self::CHOICES.iter().position(|c| *c == self.0).unwrap_or(0);
        Self(Self::CHOICES[(idx + Self::CHOICES.len() - 1) % Self::CHOICES.len()])
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(20)
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| format!("page size must be one of {:?}", Self::CHOICES))
    }
}

/// 1-based page number plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: PageSize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(PageSize::default())
    }
}

impl PageRequest {
    pub fn new(page: u32, size: PageSize) -> Self {
        Self {
            page: page.max(1),
            size,
        }
    }

    pub fn first(size: PageSize) -> Self {
        Self::new(1, size)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size.get())
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offsets() {
        for size in PageSize::CHOICES {
            let size = PageSize::new(size).unwrap();
            for page in 1..=7u32 {
                let request = PageRequest::new(page, size);
                assert_eq!(request.offset(), u64::from(page - 1) * u64::from(size.get()));
                assert_eq!(request.limit(), u64::from(size.get()));
            }
        }
        assert_eq!(PageRequest::new(0, PageSize::default()).page(), 1);
    }

    #[test]
    fn page_size_rejects_unlisted_values() {
        assert!(PageSize::new(25).is_none());
        assert_eq!("50".parse::<PageSize>().unwrap().get(), 50);
        assert_eq!(PageSize::new(100).unwrap().next().get(), 20);
        assert_eq!(PageSize::new(20).unwrap().previous().get(), 100);
    }

    #[test]
    fn sort_toggle() {
        let sort = SortSpec::default();
        let flipped = sort.toggled(Field::Id);
        assert_eq!(flipped.direction, SortDirection::Descending);
        assert_eq!(flipped.toggled(Field::Id).direction, SortDirection::Ascending);
        let other = flipped.toggled(Field::UnitPrice);
        assert_eq!(other, SortSpec::new(Field::UnitPrice, SortDirection::Ascending));
    }

    #[test]
    fn parse_sort_spec() {
        assert_eq!(
            "unitPrice:desc".parse::<SortSpec>().unwrap(),
            SortSpec::new(Field::UnitPrice, SortDirection::Descending)
        );
        assert_eq!("ten_thuoc".parse::<SortSpec>().unwrap().field, Field::DrugName);
        assert!("id:sideways".parse::<SortSpec>().is_err());
    }

    #[test]
    fn whitespace_term_is_empty_configuration() {
        assert!(SearchConfiguration::with_term("   ").is_empty());
        assert!(!SearchConfiguration::with_term("para").is_empty());
    }
}
