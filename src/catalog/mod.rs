pub mod columns;
pub mod field;
pub mod record;

pub use columns::*;
pub use field::*;
pub use record::*;
