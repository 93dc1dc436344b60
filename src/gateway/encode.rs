//! Translates a [`QueryDescriptor`] into the hosted table's REST query
//! parameters (`col=op.value`, `or=(...)`, `order=`, `offset=`, `limit=`).

use crate::catalog::Field;
use crate::query::{Clause, Comparison, Filter, Literal, QueryDescriptor, SortDirection, SortSpec};

pub type Params = Vec<(String, String)>;

/// Columns whose filter values must never reach the logs.
const SECRET_COLUMNS: &[&str] = &["password"];

/// Filter, order and window parameters for one page read.
pub fn page_params(descriptor: &QueryDescriptor) -> Params {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&descriptor.filters));
    params.push(order_param(descriptor.sort));
    params.push(("offset".to_string(), descriptor.offset.to_string()));
    params.push(("limit".to_string(), descriptor.limit.to_string()));
    params
}

pub fn filter_params(filters: &[Filter]) -> Params {
    let mut params = Params::new();
    let mut groups = Vec::new();
    for filter in filters {
        match filter {
            Filter::Clause(clause) => {
                params.push((clause.field.column().to_string(), operand(clause, false)))
            }
            Filter::Not(clause) => {
                params.push((clause.field.column().to_string(), operand(clause, true)))
            }
            Filter::AnyOf(clauses) if clauses.is_empty() => {}
            Filter::AnyOf(clauses) => groups.push(clauses),
        }
    }

    match groups.as_slice() {
        [] => {}
        [single] => params.push(("or".to_string(), format!("({})", list(single)))),
        many => {
            let nested: Vec<String> = many
                .iter()
                .map(|clauses| format!("or({})", list(clauses)))
                .collect();
            params.push(("and".to_string(), format!("({})", nested.join(","))));
        }
    }
    params
}

pub fn order_param(sort: SortSpec) -> (String, String) {
    let mut order = format!("{}.{}", sort.field.column(), direction(sort.direction));
    if sort.field != Field::Id {
        order.push_str(",id.asc");
    }
    ("order".to_string(), order)
}

/// Renders parameters the way they'd appear in a query string, unescaped.
/// Used as the page cache key.
pub fn canonical(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Like [`canonical`], with the operand of every secret column masked.
pub fn redacted(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| {
            if SECRET_COLUMNS.contains(&key.as_str()) {
                let op = value.split_once('.').map_or("", |(op, _)| op);
                format!("{key}={op}.***")
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn direction(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "asc",
        SortDirection::Descending => "desc",
    }
}

fn operator(comparison: Comparison) -> &'static str {
    match comparison {
        Comparison::ILike => "ilike",
        Comparison::Eq => "eq",
        Comparison::Gt => "gt",
        Comparison::Lt => "lt",
    }
}

fn raw_value(clause: &Clause) -> String {
    match (&clause.value, clause.comparison) {
        (Literal::Text(text), Comparison::ILike) => format!("*{text}*"),
        (value, _) => value.to_string(),
    }
}

/// `op.value` or `not.op.value` for a top-level column parameter.
fn operand(clause: &Clause, negate: bool) -> String {
    let prefix = if negate { "not." } else { "" };
    format!("{prefix}{}.{}", operator(clause.comparison), raw_value(clause))
}

/// Comma-separated `col.op.value` items for an `or=(...)` group.
fn list(clauses: &[Clause]) -> String {
    clauses
        .iter()
        .map(|clause| {
            format!(
                "{}.{}.{}",
                clause.field.column(),
                operator(clause.comparison),
                quote(&raw_value(clause))
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Values inside a logic group must be double-quoted when they contain the
/// group's reserved characters.
fn quote(value: &str) -> String {
    if !value.contains([',', '(', ')', '.', ':', '"', '\\']) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}
