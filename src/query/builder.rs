use tracing::trace;

use super::descriptor::{Clause, Comparison, Filter, Literal, QueryDescriptor};
use super::model::{Logic, Operator, PageRequest, SearchCondition, SearchConfiguration, SortSpec};
use crate::catalog::TEXT_SEARCH_FIELDS;

/// Translates the user's search state into a [`QueryDescriptor`].
///
/// Pure: conditions with blank values or numeric fields that don't parse are
/// dropped, never sent.
pub fn build(config: &SearchConfiguration, sort: SortSpec, page: PageRequest) -> QueryDescriptor {
    let mut filters = Vec::new();

    let term = config.term.trim();
    if !term.is_empty() {
        filters.push(Filter::AnyOf(
            TEXT_SEARCH_FIELDS
                .iter()
                .map(|field| Clause::new(*field, Comparison::ILike, Literal::Text(term.to_string())))
                .collect(),
        ));
    }

    let include: Vec<Clause> = config.include.iter().filter_map(to_clause).collect();
    match config.include_logic {
        Logic::And => filters.extend(include.into_iter().map(Filter::Clause)),
        Logic::Or => match include.len() {
            0 => {}
            1 => filters.extend(include.into_iter().map(Filter::Clause)),
            _ => filters.push(Filter::AnyOf(include)),
        },
    }

    filters.extend(config.exclude.iter().filter_map(to_clause).map(Filter::Not));

    let descriptor = QueryDescriptor {
        filters,
        sort,
        offset: page.offset(),
        limit: page.limit(),
    };
    trace!(descriptor = %descriptor.summary(), "built query descriptor");
    descriptor
}

fn to_clause(condition: &SearchCondition) -> Option<Clause> {
    let raw = condition.value.trim();
    if raw.is_empty() {
        return None;
    }
    let field = condition.field;

    if field.kind().is_numeric() {
        let number = raw.parse::<f64>().ok().filter(|n| n.is_finite())?;
        let comparison = match condition.operator {
            Operator::Contains | Operator::Equals => Comparison::Eq,
            Operator::GreaterThan => Comparison::Gt,
            Operator::LessThan => Comparison::Lt,
        };
        return Some(Clause::new(field, comparison, Literal::Number(number)));
    }

    let comparison = match condition.operator {
        Operator::Contains => Comparison::ILike,
        Operator::Equals => Comparison::Eq,
        Operator::GreaterThan => Comparison::Gt,
        Operator::LessThan => Comparison::Lt,
    };
    Some(Clause::new(field, comparison, Literal::Text(raw.to_string())))
}
