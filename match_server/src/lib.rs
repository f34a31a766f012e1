pub mod config;
pub mod error;
pub mod scheduler;
pub mod session;

pub use config::{SchedulerConfig, SessionConfig, SideControl};
pub use error::{SessionError, SessionId, SinkClosed};
pub use scheduler::SessionScheduler;
pub use session::{
    ChannelSink, Clock, HumanIntent, ManualClock, MatchState, Session, SessionStatus,
    SnapshotSink, SystemClock, TickReport,
};
