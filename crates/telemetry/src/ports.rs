use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use uxlab_core_types::{Theme, Variant};

use crate::context::Context;

/// Deferred unit of work handed to the host scheduler.
pub type Callback = Box<dyn FnOnce() + Send>;

/// Handle for a scheduled timer, usable to cancel it before it fires.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TimerId(pub u64);

pub trait ClockPort: Send + Sync {
    /// Milliseconds since the epoch of whatever timeline the host runs on.
    fn now_ms(&self) -> u64;
}

/// Scheduling seam towards the host page's event loop: idle callbacks with a
/// timeout fallback, cancellable timers, and a teardown notification fired
/// when the page goes away.
pub trait SchedulerPort: Send + Sync {
    fn request_idle(&self, cb: Callback, timeout_ms: u64);
    fn set_timer(&self, delay_ms: u64, cb: Callback) -> TimerId;
    fn cancel_timer(&self, id: TimerId);
    fn on_teardown(&self, cb: Callback);
}

/// Read-only view of the rendered page used to compute the context snapshot.
pub trait ContextProbe: Send + Sync {
    fn detect_variant(&self) -> Variant;
    fn theme(&self) -> Theme;
    fn user_agent(&self) -> String;
    fn viewport(&self) -> String;
}

/// Wall-clock implementation for hosts without a virtual timeline.
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Scheduler that substitutes "run immediately" for every idle signal and
/// timer. Teardown hooks are held until the owner fires them.
#[derive(Default)]
pub struct InlineScheduler {
    teardown: Mutex<Vec<Callback>>,
}

impl InlineScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Runs registered teardown hooks in registration order.
    pub fn fire_teardown(&self) {
        let hooks = std::mem::take(&mut *self.teardown.lock());
        for hook in hooks {
            hook();
        }
    }
}

impl SchedulerPort for InlineScheduler {
    fn request_idle(&self, cb: Callback, _timeout_ms: u64) {
        cb();
    }

    fn set_timer(&self, _delay_ms: u64, cb: Callback) -> TimerId {
        cb();
        TimerId(0)
    }

    fn cancel_timer(&self, _id: TimerId) {}

    fn on_teardown(&self, cb: Callback) {
        self.teardown.lock().push(cb);
    }
}

/// Probe returning a fixed context; for headless use and tests.
pub struct FixedProbe {
    context: Context,
}

impl FixedProbe {
    pub fn new(context: Context) -> Arc<Self> {
        Arc::new(Self { context })
    }
}

impl ContextProbe for FixedProbe {
    fn detect_variant(&self) -> Variant {
        self.context.variant
    }

    fn theme(&self) -> Theme {
        self.context.theme
    }

    fn user_agent(&self) -> String {
        self.context.user_agent.clone()
    }

    fn viewport(&self) -> String {
        self.context.viewport.clone()
    }
}
