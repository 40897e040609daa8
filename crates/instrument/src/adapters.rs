use std::sync::Arc;

use page_model::{Page, PageRuntime};
use telemetry::ports::{Callback, ClockPort, ContextProbe, SchedulerPort, TimerId};
use uxlab_core_types::{Theme, Variant};

/// Clock port over the simulated page runtime's virtual timeline.
pub struct RuntimeClock {
    runtime: PageRuntime,
}

impl RuntimeClock {
    pub fn new(runtime: PageRuntime) -> Arc<Self> {
        Arc::new(Self { runtime })
    }
}

impl ClockPort for RuntimeClock {
    fn now_ms(&self) -> u64 {
        self.runtime.now_ms()
    }
}

/// Scheduler port over the page runtime: idle callbacks, timers, teardown.
pub struct RuntimeScheduler {
    runtime: PageRuntime,
}

impl RuntimeScheduler {
    pub fn new(runtime: PageRuntime) -> Arc<Self> {
        Arc::new(Self { runtime })
    }
}

impl SchedulerPort for RuntimeScheduler {
    fn request_idle(&self, cb: Callback, timeout_ms: u64) {
        self.runtime.request_idle(cb, timeout_ms);
    }

    fn set_timer(&self, delay_ms: u64, cb: Callback) -> TimerId {
        TimerId(self.runtime.set_timeout(delay_ms, cb).0)
    }

    fn cancel_timer(&self, id: TimerId) {
        self.runtime.clear_timeout(page_model::TimerId(id.0));
    }

    fn on_teardown(&self, cb: Callback) {
        self.runtime.on_teardown(cb);
    }
}

/// Context probe over the rendered page. Variant detection inspects marker
/// classes in a fixed priority order; first match wins.
pub struct PageProbe {
    page: Page,
    user_agent: String,
}

impl PageProbe {
    pub fn new(page: Page, user_agent: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            page,
            user_agent: user_agent.into(),
        })
    }
}

impl ContextProbe for PageProbe {
    fn detect_variant(&self) -> Variant {
        let page = &self.page;
        if page.any_element(|p, n| p.class_contains(n, "btn"))
            && page.any_element(|p, n| p.has_class(n, "container"))
        {
            return Variant::Bootstrap;
        }
        if page.any_element(|p, n| p.has_class(n, "button"))
            && page.any_element(|p, n| p.has_class(n, "section"))
        {
            return Variant::Bulma;
        }
        Variant::Unknown
    }

    fn theme(&self) -> Theme {
        let attr = self.page.attr(self.page.document_element(), "data-theme");
        Theme::from_attr(attr.as_deref())
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn viewport(&self) -> String {
        let (width, height) = self.page.viewport();
        format!("{width}x{height}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_markers_win_over_bulma() {
        let page = Page::new();
        let container = page.append_element(page.body(), "div");
        page.set_attr(container, "class", "container");
        let button = page.append_element(container, "button");
        // "btn-primary" matches the [class*=btn] heuristic.
        page.set_attr(button, "class", "btn btn-primary");
        let probe = PageProbe::new(page, "ua");
        assert_eq!(probe.detect_variant(), Variant::Bootstrap);
    }

    #[test]
    fn bulma_markers_detected_without_bootstrap_ones() {
        let page = Page::new();
        let section = page.append_element(page.body(), "section");
        page.set_attr(section, "class", "section");
        let button = page.append_element(section, "a");
        page.set_attr(button, "class", "button is-primary");
        let probe = PageProbe::new(page, "ua");
        assert_eq!(probe.detect_variant(), Variant::Bulma);
    }

    #[test]
    fn bare_pages_stay_unknown() {
        let page = Page::new();
        page.append_element(page.body(), "main");
        let probe = PageProbe::new(page, "ua");
        assert_eq!(probe.detect_variant(), Variant::Unknown);
    }

    #[test]
    fn theme_defaults_to_light() {
        let page = Page::new();
        let probe = PageProbe::new(page.clone(), "ua");
        assert_eq!(probe.theme(), Theme::Light);
        page.set_attr(page.document_element(), "data-theme", "dark");
        assert_eq!(probe.theme(), Theme::Dark);
    }

    #[test]
    fn viewport_formats_as_wxh() {
        let page = Page::new();
        page.set_viewport(1024, 768);
        let probe = PageProbe::new(page, "ua");
        assert_eq!(probe.viewport(), "1024x768");
    }
}
