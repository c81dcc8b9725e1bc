// Game engine modules

pub mod events;
pub mod grid;
pub mod level;
pub mod matcher;
pub mod scheduler;
pub mod scorer;
pub mod word;

pub use events::EventSink;
pub use level::{GameSnapshot, LevelOrchestrator};
