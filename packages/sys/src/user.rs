//! Current user lookup.

use unsfs_core::BootstrapOptions;

/// Variables consulted, in order, for the login name.
pub const USER_VARS: [&str; 3] = ["USER", "LOGNAME", "USERNAME"];

/// Login name of the current user, from the environment.
pub fn current_user_name() -> Option<String> {
    USER_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
}

/// Bootstrap options for the current user, or `fallback` when the
/// environment does not name one.
pub fn options_for_current_user(fallback: &str) -> BootstrapOptions {
    BootstrapOptions::for_user(current_user_name().unwrap_or_else(|| fallback.to_string()))
}
