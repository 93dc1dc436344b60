use super::error::ConditionParseError;

pub struct Lexer {
    pub input: Vec<char>,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(String),
    Quoted(String),
    Tilde,
    Equal,
    Greater,
    Less,
    EOF,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    pub fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    pub fn advance(&mut self) {
        self.position += 1;
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Everything left on the line, trimmed. Bare values may contain spaces
    /// (`drugName ~ vitamin c`).
    pub fn rest(&mut self) -> String {
        self.skip_whitespace();
        let rest: String = self.input[self.position..].iter().collect();
        self.position = self.input.len();
        rest.trim_end().to_string()
    }

    pub fn read_string(&mut self, quote_char: char) -> Result<String, ConditionParseError> {
        let start = self.position;
        self.advance(); // opening quote
        let mut result = String::new();

        while let Some(ch) = self.current_char() {
            if ch == quote_char {
                self.advance();
                return Ok(result);
            } else if ch == '\\' {
                self.advance();
                match self.current_char() {
                    Some('n') => result.push('\n'),
                    Some('t') => result.push('\t'),
                    Some(c) => result.push(c),
                    None => {
                        return Err(ConditionParseError::InvalidEscapeSequence {
                            position: self.position,
                        });
                    }
                }
                self.advance();
            } else {
                result.push(ch);
                self.advance();
            }
        }

        Err(ConditionParseError::UnterminatedQuote {
            position: start,
            quote_char,
        })
    }

    pub fn read_word(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if is_word_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    pub fn next_token(&mut self) -> Result<Token, ConditionParseError> {
        self.skip_whitespace();

        match self.current_char() {
            None => Ok(Token::EOF),
            Some('~') => {
                self.advance();
                Ok(Token::Tilde)
            }
            Some('=') => {
                self.advance();
                Ok(Token::Equal)
            }
            Some('>') => {
                self.advance();
                Ok(Token::Greater)
            }
            Some('<') => {
                self.advance();
                Ok(Token::Less)
            }
            Some(quote @ ('"' | '\'')) => Ok(Token::Quoted(self.read_string(quote)?)),
            Some(ch) if is_word_char(ch) => Ok(Token::Word(self.read_word())),
            Some(ch) => Err(ConditionParseError::UnexpectedToken {
                token: ch.to_string(),
                position: self.position,
            }),
        }
    }

    pub fn peek_token(&mut self) -> Result<Token, ConditionParseError> {
        let saved_position = self.position;
        let token = self.next_token()?;
        self.position = saved_position;
        Ok(token)
    }
}

fn is_word_char(ch: char) -> bool {
    !ch.is_whitespace() && !matches!(ch, '~' | '=' | '<' | '>' | '"' | '\'')
}
