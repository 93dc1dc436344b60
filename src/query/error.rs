#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionParseError {
    #[error("Unterminated quote '{quote_char}' at position {position}")]
    UnterminatedQuote { position: usize, quote_char: char },
    #[error("Invalid escape sequence at position {position}")]
    InvalidEscapeSequence { position: usize },
    #[error("Unknown field '{name}' at position {position}")]
    UnknownField { name: String, position: usize },
    #[error("Expected one of ~ = > < (or contains, equals, gt, lt) at position {position}, found '{token}'")]
    ExpectedOperator { token: String, position: usize },
    #[error("Missing value for '{field}' at position {position}")]
    MissingValue { field: String, position: usize },
    #[error("Unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },
    #[error("Unexpected end of input at position {position}")]
    UnexpectedEndOfInput { position: usize },
}

impl ConditionParseError {
    pub fn position(&self) -> usize {
        match self {
            ConditionParseError::UnterminatedQuote { position, .. }
            | ConditionParseError::InvalidEscapeSequence { position }
            | ConditionParseError::UnknownField { position, .. }
            | ConditionParseError::ExpectedOperator { position, .. }
            | ConditionParseError::MissingValue { position, .. }
            | ConditionParseError::UnexpectedToken { position, .. }
            | ConditionParseError::UnexpectedEndOfInput { position } => *position,
        }
    }
}
