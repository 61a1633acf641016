pub mod file;
pub mod text;
pub mod time;

pub use file::write_atomic;
pub use text::{fit_width, normalize_symbol, pad_width};
pub use time::{age_label, clock_label};
