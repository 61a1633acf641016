pub mod bootstrap;
pub mod controller;
pub mod state;
pub mod timer;

pub use controller::AppController;
pub use state::MonitorState;
pub use timer::{RefreshTimer, TimerState};
