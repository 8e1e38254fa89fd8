use std::env;
use std::sync::OnceLock;

static POOL_DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if the POOL_DEBUG environment variable is set.
/// The lookup is cached on first call, so flipping the variable later on
/// has no effect on configurations built afterwards.
#[inline]
pub fn debug_from_env() -> bool {
    *POOL_DEBUG_ENABLED.get_or_init(|| parse_debug_flag(env::var("POOL_DEBUG").ok().as_deref()))
}

/// An unset variable, `""`, `"0"` and `"false"` are off. Anything else is on.
fn parse_debug_flag(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(value) => !matches!(value, "" | "0" | "false"),
    }
}
