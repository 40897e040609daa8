pub mod config;
pub mod context;
pub mod errors;
pub mod export;
pub mod journal;
pub mod model;
pub mod ports;
pub mod recorder;
pub mod spans;

pub use config::{PersistPolicy, RecorderCfg};
pub use context::{Context, ContextPatch};
pub use errors::{TelemetryError, TelemetryErrorKind};
pub use model::{extra, EndOpts, Event, EventKind, Extra};
pub use ports::{ClockPort, ContextProbe, FixedProbe, InlineScheduler, SchedulerPort, SystemClock};
pub use recorder::{PostHook, Recorder};
