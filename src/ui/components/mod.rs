pub mod table;
pub mod terminal;
pub mod utils;

pub use table::{column, column_table, Column};
pub use terminal::TerminalGuard;
