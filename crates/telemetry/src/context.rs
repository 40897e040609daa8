use uxlab_core_types::{Theme, Variant};

/// Page-load context merged into every event. Computed once at deferred-init
/// time; only `theme` may change afterwards (storage notifications from
/// elsewhere, or an explicit patch).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    pub variant: Variant,
    pub theme: Theme,
    pub user_agent: String,
    pub viewport: String,
}

/// Partial context supplied through `Recorder::set_context`; unset fields
/// keep their current value.
#[derive(Clone, Debug, Default)]
pub struct ContextPatch {
    pub variant: Option<Variant>,
    pub theme: Option<Theme>,
    pub user_agent: Option<String>,
    pub viewport: Option<String>,
}

impl Context {
    pub fn apply(&mut self, patch: ContextPatch) {
        if let Some(variant) = patch.variant {
            self.variant = variant;
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(user_agent) = patch.user_agent {
            self.user_agent = user_agent;
        }
        if let Some(viewport) = patch.viewport {
            self.viewport = viewport;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_merges_shallowly() {
        let mut ctx = Context {
            variant: Variant::Bulma,
            theme: Theme::Light,
            user_agent: "ua".into(),
            viewport: "800x600".into(),
        };
        ctx.apply(ContextPatch {
            theme: Some(Theme::Dark),
            ..Default::default()
        });
        assert_eq!(ctx.variant, Variant::Bulma);
        assert_eq!(ctx.theme, Theme::Dark);
        assert_eq!(ctx.viewport, "800x600");
    }
}
