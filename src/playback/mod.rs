pub mod config;
pub mod controller;
pub mod cursor;
pub mod loop_worker;
pub mod queue;
pub mod scheduler;

pub use config::{PlaybackConfig, PlaybackOptions, StrokeRange};
pub use controller::{PlaybackController, PlaybackStatus};
pub use cursor::PlaybackCursor;
pub use loop_worker::{producer_loop, scheduler_loop};
pub use queue::{pending_queue, QueueConsumer, QueueProducer};
pub use scheduler::{PlaybackScheduler, PlayerState, SchedulerStatus, SequenceSource, StopKind};
