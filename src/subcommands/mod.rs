use color_eyre::{Result, eyre::WrapErr};
use drugprice::query::{Logic, SearchConfiguration, SortSpec, parse_condition};

pub mod account;
pub mod distinct;
pub mod export;
pub mod search;
pub mod stats;
pub mod suggest;

/// Search term and conditions shared by every command that queries rows.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct FilterArgs {
    /// Free-text term matched against name, ingredient, manufacturer, notice id and group
    pub term: Option<String>,

    /// Include condition, e.g. `unitPrice > 1000` or `dosageForm ~ "viên nén"`
    #[arg(short = 'w', long = "where", value_name = "CONDITION")]
    pub include: Vec<String>,

    /// How include conditions combine
    #[arg(long, default_value = "and", value_name = "and|or")]
    pub logic: Logic,

    /// Exclude condition; each one is negated on its own
    #[arg(short = 'x', long = "exclude", value_name = "CONDITION")]
    pub exclude: Vec<String>,
}

impl FilterArgs {
    pub fn configuration(&self) -> Result<SearchConfiguration> {
        let parse = |raw: &String| {
            parse_condition(raw).wrap_err_with(|| format!("invalid condition '{raw}'"))
        };
        Ok(SearchConfiguration {
            term: self.term.clone().unwrap_or_default(),
            include: self.include.iter().map(parse).collect::<Result<_>>()?,
            include_logic: self.logic,
            exclude: self.exclude.iter().map(parse).collect::<Result<_>>()?,
        })
    }
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct SortArgs {
    /// Sort column, optionally with a direction: `unitPrice:desc`
    #[arg(long, value_name = "FIELD[:asc|desc]")]
    pub sort: Option<SortSpec>,
}

impl SortArgs {
    pub fn spec(&self) -> SortSpec {
        self.sort.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use drugprice::catalog::Field;
    use drugprice::query::Operator;

    use super::*;

    #[test]
    fn filter_args_parse_conditions() {
        let args = FilterArgs {
            term: Some("amoxicillin".to_string()),
            include: vec!["unitPrice > 1000".to_string()],
            logic: Logic::Or,
            exclude: vec!["dosageForm ~ tiêm".to_string()],
        };
        let config = args.configuration().unwrap();
        assert_eq!(config.term, "amoxicillin");
        assert_eq!(config.include[0].field, Field::UnitPrice);
        assert_eq!(config.include[0].operator, Operator::GreaterThan);
        assert_eq!(config.include_logic, Logic::Or);
        assert_eq!(config.exclude[0].value, "tiêm");
    }

    #[test]
    fn bad_condition_names_the_input() {
        let args = FilterArgs {
            include: vec!["colour = red".to_string()],
            ..FilterArgs::default()
        };
        let err = args.configuration().unwrap_err();
        assert!(format!("{err}").contains("colour = red"));
    }
}
