use std::sync::Arc;

use kv_store::KvStore;
use page_model::Page;
use tracing::warn;
use uxlab_core_types::Theme;

pub const THEME_KEY: &str = "pref-theme";

/// Persisted theme preference plus the glue applying it to a page root.
#[derive(Clone)]
pub struct ThemePref {
    store: Arc<dyn KvStore>,
}

impl ThemePref {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn stored(&self) -> Option<Theme> {
        match self.store.get(THEME_KEY)?.as_str() {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    /// Stored preference wins; otherwise the environment's color-scheme hint.
    pub fn initial(&self, prefers_dark: bool) -> Theme {
        self.stored()
            .unwrap_or(if prefers_dark { Theme::Dark } else { Theme::Light })
    }

    /// Writes the theme onto the page root and persists the preference.
    pub fn apply(&self, page: &Page, theme: Theme) {
        page.set_attr(page.document_element(), "data-theme", theme.as_str());
        if let Err(err) = self.store.set(THEME_KEY, theme.as_str()) {
            warn!(%err, "theme preference not persisted");
        }
    }

    pub fn toggle(&self, page: &Page) -> Theme {
        let current = Theme::from_attr(page.attr(page.document_element(), "data-theme").as_deref());
        let next = current.toggled();
        self.apply(page, next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use kv_store::MemoryStore;

    #[test]
    fn initial_prefers_stored_over_environment() {
        let store = MemoryStore::new();
        let pref = ThemePref::new(store.clone());
        assert_eq!(pref.initial(true), Theme::Dark);
        assert_eq!(pref.initial(false), Theme::Light);

        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(pref.initial(false), Theme::Dark);
    }

    #[test]
    fn toggle_flips_page_attribute_and_preference() {
        let store = MemoryStore::new();
        let pref = ThemePref::new(store.clone());
        let page = Page::new();
        pref.apply(&page, Theme::Light);

        let next = pref.toggle(&page);
        assert_eq!(next, Theme::Dark);
        assert_eq!(
            page.attr(page.document_element(), "data-theme").as_deref(),
            Some("dark")
        );
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
    }

    #[test]
    fn unknown_stored_value_reads_as_absent() {
        let store = MemoryStore::new();
        store.set(THEME_KEY, "sepia").unwrap();
        let pref = ThemePref::new(store);
        assert!(pref.stored().is_none());
    }
}
