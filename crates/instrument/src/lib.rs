pub mod adapters;
pub mod binder;

pub use adapters::{PageProbe, RuntimeClock, RuntimeScheduler};
pub use binder::{Instrumenter, CLICK_ATTR, FORM_ATTR};
