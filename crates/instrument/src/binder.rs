use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use page_model::{EventType, NodeId, Page};
use parking_lot::Mutex;
use serde_json::json;
use telemetry::{extra, EndOpts, Extra, Recorder};
use tracing::debug;

/// Marks an element for explicit click logging under the attribute's value.
pub const CLICK_ATTR: &str = "data-metric-click";
/// Marks a form with the task name its focus/submit cycle is logged under.
pub const FORM_ATTR: &str = "data-metric-form";

const AUTO_LABEL_MAX: usize = 40;

struct BinderInner {
    recorder: Recorder,
    bound_forms: Mutex<HashSet<NodeId>>,
    // Whether the current focus cycle of a bound form already started a span.
    cycle_started: Mutex<HashMap<NodeId, bool>>,
}

/// Wires the telemetry recorder into a page: one delegated click listener,
/// form lifecycle listeners, and re-binding for forms inserted after load.
#[derive(Clone)]
pub struct Instrumenter {
    inner: Arc<BinderInner>,
}

impl Instrumenter {
    pub fn attach(page: &Page, recorder: Recorder) -> Self {
        let binder = Self {
            inner: Arc::new(BinderInner {
                recorder,
                bound_forms: Mutex::new(HashSet::new()),
                cycle_started: Mutex::new(HashMap::new()),
            }),
        };

        let clicks = binder.clone();
        page.add_click_listener(Arc::new(move |page, target| {
            clicks.on_click(page, target);
        }));

        for form in page.forms() {
            binder.bind_form(page, form);
        }

        let late = binder.clone();
        page.observe_mutations(Arc::new(move |page, added| {
            for root in added {
                for form in page.forms_within(*root) {
                    late.bind_form(page, form);
                }
            }
        }));

        binder
    }

    /// Binds one form's lifecycle listeners. Idempotent, and public so page
    /// composition glue can register forms it creates itself.
    pub fn bind_form(&self, page: &Page, form: NodeId) {
        if !self.inner.bound_forms.lock().insert(form) {
            return;
        }
        let task_name = page
            .attr(form, FORM_ATTR)
            .or_else(|| page.attr(form, "id"))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "form".to_string());
        debug!(?form, %task_name, "binding form lifecycle");

        let inner = Arc::clone(&self.inner);
        let name = task_name.clone();
        page.add_node_listener(
            form,
            EventType::FocusIn,
            Arc::new(move |_, _| {
                let mut cycles = inner.cycle_started.lock();
                let started = cycles.entry(form).or_insert(false);
                if !*started {
                    inner.recorder.start_task(&name, Extra::new());
                    *started = true;
                }
            }),
        );

        let inner = Arc::clone(&self.inner);
        let name = task_name.clone();
        page.add_node_listener(
            form,
            EventType::Submit,
            Arc::new(move |page, _| {
                let valid = page.check_validity(form);
                inner.recorder.end_task(
                    &name,
                    EndOpts::succeeded(valid).with_extra(extra([("submit", json!(true))])),
                );
                inner.cycle_started.lock().insert(form, false);
            }),
        );

        let inner = Arc::clone(&self.inner);
        let name = task_name;
        page.add_node_listener(
            form,
            EventType::Invalid,
            Arc::new(move |page, field| {
                let field_name = page.attr(field, "name").unwrap_or_default();
                inner.recorder.error(
                    "html5_invalid",
                    extra([("name", json!(name)), ("field", json!(field_name))]),
                );
            }),
        );
    }

    fn on_click(&self, page: &Page, target: NodeId) {
        if let Some(marked) = page.closest(target, |p, n| p.attr(n, CLICK_ATTR).is_some()) {
            let name = page.attr(marked, CLICK_ATTR).unwrap_or_default();
            self.inner.recorder.click(&name, Extra::new());
            return;
        }
        let interactive = page.closest(target, |p, n| {
            let tag = p.tag(n);
            tag == "button" || tag == "a" || p.attr(n, "role").as_deref() == Some("button")
        });
        if let Some(el) = interactive {
            let label = auto_label(page, el);
            self.inner.recorder.click(&format!("auto:{label}"), Extra::new());
        }
    }
}

/// Label for auto-tracked clicks: element id, accessible label, trimmed
/// visible text (capped), or tag name, in that order.
fn auto_label(page: &Page, el: NodeId) -> String {
    if let Some(id) = page.attr(el, "id").filter(|id| !id.is_empty()) {
        return id;
    }
    if let Some(label) = page.attr(el, "aria-label").filter(|label| !label.is_empty()) {
        return label;
    }
    let content = page.text_content(el);
    let text: String = content.trim().chars().take(AUTO_LABEL_MAX).collect();
    if !text.is_empty() {
        return text;
    }
    page.tag(el)
}
