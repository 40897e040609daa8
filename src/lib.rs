pub mod cli;
pub mod pages;
pub mod scenario;

/// User agent string reported by the simulated browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) uxlab-sim/0.1";
