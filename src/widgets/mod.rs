pub mod browser;
pub mod help;
pub mod input;
pub mod theme;

pub use browser::Browser;
