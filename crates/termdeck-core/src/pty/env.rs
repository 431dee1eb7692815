//! Environment construction for spawned sessions

use std::collections::BTreeMap;

/// Build the environment for a new PTY process.
///
/// Starts from `inherited`, applies `overlay`, removes every variable named
/// in `strip`, then forces `TERM`.
pub fn build_env<I>(
    inherited: I,
    overlay: &[(String, String)],
    term: &str,
    strip: &[String],
) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env: BTreeMap<String, String> = inherited.into_iter().collect();
    for (key, value) in overlay {
        env.insert(key.clone(), value.clone());
    }
    for key in strip {
        env.remove(key);
    }
    env.insert("TERM".to_string(), term.to_string());
    env.into_iter().collect()
}

/// Current process environment, skipping entries that are not valid UTF-8
pub fn inherited_env() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
}
