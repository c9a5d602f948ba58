pub mod achievements;
pub mod agent;
pub mod clock;
pub mod daily;
pub mod error;
pub mod grid;
pub mod leaderboard;
pub mod line;
pub mod mode;
pub mod replay;
pub mod rng;
pub mod round_timer;
pub mod serde_duration;
pub mod session;
pub mod settings;
pub mod spawner;
pub mod store;

pub use grid::{Direction, Grid, GridEngine, MoveResult};
pub use mode::GameMode;
pub use session::{Command, SessionController, SessionEvent, SessionState};
