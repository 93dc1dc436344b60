pub mod builder;
pub mod descriptor;
pub mod error;
pub mod lexer;
pub mod model;
pub mod parser;

pub use builder::build;
pub use descriptor::*;
pub use error::*;
pub use model::*;
pub use parser::parse_condition;
