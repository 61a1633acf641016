pub mod watchlist;

pub use watchlist::{WatchlistStore, WatchlistUpdate};
