use super::error::ConditionParseError;
use super::lexer::{Lexer, Token};
use super::model::{Operator, SearchCondition};
use crate::catalog::Field;

/// Parses a single `FIELD OP VALUE` condition, e.g. `unitPrice > 5000` or
/// `drugName contains "vitamin c"`.
pub fn parse_condition(input: &str) -> Result<SearchCondition, ConditionParseError> {
    let mut lexer = Lexer::new(input);
    let field = parse_field(&mut lexer)?;
    let operator = parse_operator(&mut lexer)?;
    let value = parse_value(&mut lexer, field)?;
    Ok(SearchCondition::new(field, operator, value))
}

fn parse_field(lexer: &mut Lexer) -> Result<Field, ConditionParseError> {
    lexer.skip_whitespace();
    let position = lexer.position;
    match lexer.next_token()? {
        Token::Word(name) | Token::Quoted(name) => name
            .parse::<Field>()
            .map_err(|_| ConditionParseError::UnknownField { name, position }),
        Token::EOF => Err(ConditionParseError::UnexpectedEndOfInput { position }),
        token => Err(ConditionParseError::UnexpectedToken {
            token: describe(&token),
            position,
        }),
    }
}

fn parse_operator(lexer: &mut Lexer) -> Result<Operator, ConditionParseError> {
    lexer.skip_whitespace();
    let position = lexer.position;
    let operator = match lexer.next_token()? {
        Token::Tilde => Operator::Contains,
        Token::Equal => Operator::Equals,
        Token::Greater => Operator::GreaterThan,
        Token::Less => Operator::LessThan,
        Token::Word(word) => match word.to_ascii_lowercase().as_str() {
            "contains" | "has" => Operator::Contains,
            "equals" | "eq" | "is" => Operator::Equals,
            "greater_than" | "gt" => Operator::GreaterThan,
            "less_than" | "lt" => Operator::LessThan,
            _ => {
                return Err(ConditionParseError::ExpectedOperator {
                    token: word,
                    position,
                });
            }
        },
        Token::EOF => return Err(ConditionParseError::UnexpectedEndOfInput { position }),
        token => {
            return Err(ConditionParseError::ExpectedOperator {
                token: describe(&token),
                position,
            });
        }
    };
    Ok(operator)
}

fn parse_value(lexer: &mut Lexer, field: Field) -> Result<String, ConditionParseError> {
    lexer.skip_whitespace();
    let position = lexer.position;
    match lexer.next_token()? {
        Token::EOF => Err(ConditionParseError::MissingValue {
            field: field.key().to_string(),
            position,
        }),
        Token::Quoted(value) => match lexer.next_token()? {
            Token::EOF => Ok(value),
            token => Err(ConditionParseError::UnexpectedToken {
                token: describe(&token),
                position: lexer.position,
            }),
        },
        _ => {
            lexer.position = position;
            Ok(lexer.rest())
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word(word) => word.clone(),
        Token::Quoted(text) => format!("{text:?}"),
        Token::Tilde => "~".to_string(),
        Token::Equal => "=".to_string(),
        Token::Greater => ">".to_string(),
        Token::Less => "<".to_string(),
        Token::EOF => "end of input".to_string(),
    }
}
