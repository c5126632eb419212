//! Environment handed to spawned commands

use std::collections::HashMap;

/// The environment of the current user
///
/// Commands run with this environment unless the front-end supplies its own.
/// Values that are not valid Unicode are converted lossily.
pub fn user_environment() -> HashMap<String, String> {
    std::env::vars_os()
        .map(|(key, value)| {
            (
                key.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        })
        .collect()
}
