use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use kv_store::KvStore;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};
use uxlab_core_types::{SessionId, SpanId};

use crate::config::{PersistPolicy, RecorderCfg};
use crate::context::{Context, ContextPatch};
use crate::errors::TelemetryError;
use crate::export;
use crate::journal::EventJournal;
use crate::model::{EndOpts, Event, EventKind, Extra};
use crate::ports::{ClockPort, ContextProbe, SchedulerPort, TimerId};
use crate::spans::SpanTracker;

/// Observer invoked after every appended event, outside the recorder lock.
pub type PostHook = Arc<dyn Fn(&Event) + Send + Sync + 'static>;

struct RecorderState {
    log: Vec<Event>,
    loaded: bool,
    context: Context,
    spans: SpanTracker,
    pending_flush: Option<TimerId>,
    activated: bool,
    initialized: bool,
}

struct RecorderInner {
    cfg: RecorderCfg,
    session: SessionId,
    clock: Arc<dyn ClockPort>,
    scheduler: Arc<dyn SchedulerPort>,
    probe: Arc<dyn ContextProbe>,
    store: Arc<dyn KvStore>,
    journal: EventJournal,
    state: Mutex<RecorderState>,
    hooks: HookRegistry,
}

/// The telemetry façade: one instance per page load, constructed at
/// bootstrap and passed by handle to everything that logs events. Creation
/// is near-instant; storage reads and context detection wait for
/// `activate()`'s idle point so page paint is never blocked.
#[derive(Clone)]
pub struct Recorder {
    inner: Arc<RecorderInner>,
}

impl Recorder {
    pub fn create(
        cfg: RecorderCfg,
        clock: Arc<dyn ClockPort>,
        scheduler: Arc<dyn SchedulerPort>,
        probe: Arc<dyn ContextProbe>,
        store: Arc<dyn KvStore>,
    ) -> Self {
        let journal = EventJournal::new(Arc::clone(&store), cfg.storage_key.clone());
        Self {
            inner: Arc::new(RecorderInner {
                cfg,
                session: SessionId::new(),
                clock,
                scheduler,
                probe,
                store,
                journal,
                state: Mutex::new(RecorderState {
                    log: Vec::new(),
                    loaded: false,
                    context: Context::default(),
                    spans: SpanTracker::default(),
                    pending_flush: None,
                    activated: false,
                    initialized: false,
                }),
                hooks: HookRegistry::default(),
            }),
        }
    }

    /// Schedules deferred init at the host's next idle point (bounded by the
    /// configured timeout). Safe to call more than once.
    pub fn activate(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.activated {
                return;
            }
            state.activated = true;
        }
        let weak = Arc::downgrade(&self.inner);
        let timeout = self.inner.cfg.idle_timeout_ms;
        self.inner.scheduler.request_idle(
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Recorder { inner }.deferred_init();
                }
            }),
            timeout,
        );
    }

    fn deferred_init(&self) {
        let context = Context {
            variant: self.inner.probe.detect_variant(),
            theme: self.inner.probe.theme(),
            user_agent: self.inner.probe.user_agent(),
            viewport: self.inner.probe.viewport(),
        };
        {
            let mut state = self.inner.state.lock();
            if state.initialized {
                return;
            }
            state.initialized = true;
            ensure_loaded(&self.inner.journal, &mut state);
            state.context = context;
        }

        // Theme is the one context field allowed to drift: re-read it when
        // the shared store mutates under a key other than our own.
        let weak: Weak<RecorderInner> = Arc::downgrade(&self.inner);
        self.inner.store.subscribe(Arc::new(move |key| {
            if let Some(inner) = weak.upgrade() {
                if key != inner.journal.key() {
                    let theme = inner.probe.theme();
                    inner.state.lock().context.theme = theme;
                }
            }
        }));

        let weak: Weak<RecorderInner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.on_teardown(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Recorder { inner }.flush();
            }
        }));

        debug!(session = %self.inner.session, "telemetry recorder initialized");
    }

    pub fn session(&self) -> SessionId {
        self.inner.session.clone()
    }

    pub fn context(&self) -> Context {
        self.inner.state.lock().context.clone()
    }

    /// Shallow-merges caller-supplied context fields (escape hatch for
    /// page-specific enrichment).
    pub fn set_context(&self, patch: ContextPatch) {
        self.inner.state.lock().context.apply(patch);
    }

    pub fn register_post_hook(&self, hook: PostHook) {
        self.inner.hooks.register(hook);
    }

    pub fn click(&self, name: &str, extra: Extra) -> Event {
        self.log_simple(EventKind::Click, Some(name), None, extra)
    }

    pub fn error(&self, code: &str, extra: Extra) -> Event {
        self.log_simple(EventKind::Error, None, Some(code), extra)
    }

    pub fn mark(&self, name: &str, extra: Extra) -> Event {
        self.log_simple(EventKind::Mark, Some(name), None, extra)
    }

    pub fn start_task(&self, name: &str, extra: Extra) -> SpanId {
        let (event, id) = {
            let mut state = self.inner.state.lock();
            ensure_loaded(&self.inner.journal, &mut state);
            let now = self.inner.clock.now_ms();
            let id = state.spans.start(name, now);
            let mut event = self.blank_event(&state, EventKind::TaskStart, now);
            event.id = Some(id.clone());
            event.name = Some(name.to_string());
            event.extra = extra;
            self.append_locked(&mut state, event.clone());
            (event, id)
        };
        self.after_append(&event);
        id
    }

    /// Closes a span by id or by most-recent name match; an unmatched close
    /// yields an event without `duration_ms` rather than an error.
    pub fn end_task(&self, name_or_id: &str, opts: EndOpts) -> Event {
        let event = {
            let mut state = self.inner.state.lock();
            ensure_loaded(&self.inner.journal, &mut state);
            let now = self.inner.clock.now_ms();
            let resolved = state.spans.resolve_end(name_or_id, now);
            let mut event = self.blank_event(&state, EventKind::TaskEnd, now);
            event.id = Some(resolved.id);
            event.name = Some(resolved.name);
            event.duration_ms = resolved.duration_ms;
            event.success = opts.success;
            event.extra = opts.extra;
            self.append_locked(&mut state, event.clone());
            event
        };
        self.after_append(&event);
        event
    }

    pub fn end_task_with_outcome(&self, name_or_id: &str, success: bool) -> Event {
        self.end_task(name_or_id, EndOpts::succeeded(success))
    }

    /// Forces the log to durable storage now, cancelling any pending
    /// debounced write so nothing is written twice. The teardown hook calls
    /// this; callers may too.
    pub fn flush(&self) {
        let pending = {
            let mut state = self.inner.state.lock();
            if !state.loaded {
                // Nothing appended and nothing read yet; writing now would
                // clobber a previous page load's events with an empty array.
                return;
            }
            state.pending_flush.take()
        };
        if let Some(timer) = pending {
            self.inner.scheduler.cancel_timer(timer);
        }
        let state = self.inner.state.lock();
        self.inner.journal.write(&state.log);
    }

    /// Snapshot of the full event log, persisted history included.
    pub fn events(&self) -> Vec<Event> {
        let mut state = self.inner.state.lock();
        ensure_loaded(&self.inner.journal, &mut state);
        state.log.clone()
    }

    /// Writes the flattened CSV report. Returns Ok(None) when there is
    /// nothing to export; the caller owns surfacing that notice.
    pub fn export_csv(&self, filename: Option<&str>) -> Result<Option<PathBuf>, TelemetryError> {
        let events = self.events();
        if events.is_empty() {
            return Ok(None);
        }
        let variant = self.inner.state.lock().context.variant;
        let filename = match filename {
            Some(name) => name.to_string(),
            None => export::default_export_name(variant, self.inner.clock.now_ms()),
        };
        let path = self.inner.cfg.export_dir.join(filename);
        export::write_report(&path, &events)?;
        Ok(Some(path))
    }

    fn log_simple(
        &self,
        kind: EventKind,
        name: Option<&str>,
        code: Option<&str>,
        extra: Extra,
    ) -> Event {
        let event = {
            let mut state = self.inner.state.lock();
            ensure_loaded(&self.inner.journal, &mut state);
            let now = self.inner.clock.now_ms();
            let mut event = self.blank_event(&state, kind, now);
            event.name = name.map(str::to_string);
            event.code = code.map(str::to_string);
            event.extra = extra;
            self.append_locked(&mut state, event.clone());
            event
        };
        self.after_append(&event);
        event
    }

    fn blank_event(&self, state: &RecorderState, kind: EventKind, now: u64) -> Event {
        Event {
            timestamp: now,
            kind,
            session: self.inner.session.clone(),
            variant: state.context.variant,
            theme: state.context.theme,
            user_agent: state.context.user_agent.clone(),
            viewport: state.context.viewport.clone(),
            id: None,
            name: None,
            code: None,
            extra: Extra::new(),
            duration_ms: None,
            success: None,
        }
    }

    fn append_locked(&self, state: &mut RecorderState, event: Event) {
        state.log.push(event);
        if self.inner.cfg.persist == PersistPolicy::Immediate {
            self.inner.journal.write(&state.log);
        }
    }

    fn after_append(&self, event: &Event) {
        if let PersistPolicy::Debounced { delay_ms } = self.inner.cfg.persist {
            self.schedule_flush(delay_ms);
        }
        self.inner.hooks.emit(event);
    }

    fn schedule_flush(&self, delay_ms: u64) {
        // A later append supersedes the pending write.
        let stale = self.inner.state.lock().pending_flush.take();
        if let Some(timer) = stale {
            self.inner.scheduler.cancel_timer(timer);
        }
        let weak = Arc::downgrade(&self.inner);
        let timer = self.inner.scheduler.set_timer(
            delay_ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut state = inner.state.lock();
                    state.pending_flush = None;
                    inner.journal.write(&state.log);
                }
            }),
        );
        self.inner.state.lock().pending_flush = Some(timer);
    }
}

fn ensure_loaded(journal: &EventJournal, state: &mut RecorderState) {
    if state.loaded {
        return;
    }
    let mut persisted = journal.read();
    persisted.append(&mut state.log);
    state.log = persisted;
    state.loaded = true;
}

#[derive(Default)]
struct HookRegistry {
    hooks: RwLock<Vec<PostHook>>,
}

impl HookRegistry {
    fn register(&self, hook: PostHook) {
        self.hooks.write().push(hook);
    }

    fn emit(&self, event: &Event) {
        let snapshot: Vec<PostHook> = self.hooks.read().iter().cloned().collect();
        for hook in snapshot {
            if panic::catch_unwind(panic::AssertUnwindSafe(|| (hook)(event))).is_err() {
                warn!("telemetry post-hook panicked; continuing");
            }
        }
    }
}
