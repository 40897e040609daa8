use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// One-shot callback owned by the loop until its turn comes.
pub type Callback = Box<dyn FnOnce() + Send>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TimerId(pub u64);

enum Job {
    Timer(Callback),
    Idle(Callback),
}

struct LoopState {
    now_ms: u64,
    next_seq: u64,
    // Keyed by (due, seq) so simultaneous deadlines keep scheduling order.
    jobs: BTreeMap<(u64, u64), (Option<TimerId>, Job)>,
    teardown: Vec<Callback>,
    torn_down: bool,
}

impl LoopState {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Single-threaded cooperative loop with virtual time: timers, idle
/// callbacks with a timeout fallback, and a teardown notification fired
/// exactly once. The host page's UI event loop, simulated.
#[derive(Clone)]
pub struct PageRuntime {
    state: Arc<Mutex<LoopState>>,
}

impl PageRuntime {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Starts the virtual clock at `epoch_ms`, letting consecutive simulated
    /// page loads continue one timeline.
    pub fn starting_at(epoch_ms: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(LoopState {
                now_ms: epoch_ms,
                next_seq: 0,
                jobs: BTreeMap::new(),
                teardown: Vec::new(),
                torn_down: false,
            })),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.state.lock().now_ms
    }

    pub fn set_timeout(&self, delay_ms: u64, cb: Callback) -> TimerId {
        let mut state = self.state.lock();
        let seq = state.seq();
        let id = TimerId(seq);
        let due = state.now_ms.saturating_add(delay_ms);
        state.jobs.insert((due, seq), (Some(id), Job::Timer(cb)));
        id
    }

    pub fn clear_timeout(&self, id: TimerId) {
        let mut state = self.state.lock();
        state
            .jobs
            .retain(|_, (timer, _)| *timer != Some(id));
    }

    /// Queues `cb` for the next idle point; if the loop stays busy past
    /// `timeout_ms` of virtual time, the callback runs anyway.
    pub fn request_idle(&self, cb: Callback, timeout_ms: u64) {
        let mut state = self.state.lock();
        let seq = state.seq();
        let deadline = state.now_ms.saturating_add(timeout_ms);
        state.jobs.insert((deadline, seq), (None, Job::Idle(cb)));
    }

    pub fn on_teardown(&self, cb: Callback) {
        let mut state = self.state.lock();
        if state.torn_down {
            debug!("teardown hook registered after teardown; dropped");
            return;
        }
        state.teardown.push(cb);
    }

    /// Advances virtual time by `ms`, running every timer and expired idle
    /// callback in deadline order. Work scheduled by callbacks inside the
    /// window runs within the same call.
    pub fn advance(&self, ms: u64) {
        let target = {
            let state = self.state.lock();
            if state.torn_down {
                return;
            }
            state.now_ms.saturating_add(ms)
        };
        loop {
            let job = {
                let mut state = self.state.lock();
                match state.jobs.keys().next().copied() {
                    Some(key) if key.0 <= target => {
                        state.now_ms = state.now_ms.max(key.0);
                        state.jobs.remove(&key).map(|(_, job)| job)
                    }
                    _ => {
                        state.now_ms = target;
                        None
                    }
                }
            };
            match job {
                Some(Job::Timer(cb)) | Some(Job::Idle(cb)) => cb(),
                None => break,
            }
        }
    }

    /// Drains everything already due plus all pending idle callbacks without
    /// moving the clock: the loop has gone quiet.
    pub fn run_until_idle(&self) {
        loop {
            let job = {
                let mut state = self.state.lock();
                if state.torn_down {
                    return;
                }
                let now = state.now_ms;
                let due_key = state
                    .jobs
                    .iter()
                    .find(|((due, _), (_, job))| *due <= now || matches!(job, Job::Idle(_)))
                    .map(|(key, _)| *key);
                match due_key {
                    Some(key) => state.jobs.remove(&key).map(|(_, job)| job),
                    None => None,
                }
            };
            match job {
                Some(Job::Timer(cb)) | Some(Job::Idle(cb)) => cb(),
                None => break,
            }
        }
    }

    /// Fires teardown hooks in registration order, exactly once. Pending
    /// timers and idle callbacks never run after this.
    pub fn teardown(&self) {
        let hooks = {
            let mut state = self.state.lock();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            state.jobs.clear();
            std::mem::take(&mut state.teardown)
        };
        for hook in hooks {
            hook();
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.lock().torn_down
    }
}

impl Default for PageRuntime {
    fn default() -> Self {
        Self::new()
    }
}
