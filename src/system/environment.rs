// src/system/environment.rs

use std::collections::HashSet;
use std::env;
use std::ffi::{OsStr, OsString};

/// A source for the ambient environment a child would otherwise inherit.
pub trait EnvironmentSource {
    /// All variables, in the order the source reports them.
    fn snapshot(&self) -> Vec<(OsString, OsString)>;

    /// A single variable.
    fn var(&self, key: &str) -> Option<OsString> {
        self.snapshot()
            .into_iter()
            .find(|(name, _)| name.as_os_str() == OsStr::new(key))
            .map(|(_, value)| value)
    }
}

/// The environment of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvironmentSource for ProcessEnvironment {
    fn snapshot(&self) -> Vec<(OsString, OsString)> {
        env::vars_os().collect()
    }

    fn var(&self, key: &str) -> Option<OsString> {
        env::var_os(key)
    }
}

/// A fixed set of variables. Mostly useful to make tests independent of the real environment.
#[derive(Debug, Default, Clone)]
pub struct FixedEnvironment {
    vars: Vec<(OsString, OsString)>,
}

impl FixedEnvironment {
    /// Creates a source from `(key, value)` pairs.
    pub fn new<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl EnvironmentSource for FixedEnvironment {
    fn snapshot(&self) -> Vec<(OsString, OsString)> {
        self.vars.clone()
    }
}

/// Splits a `KEY=VALUE` entry on its first `=`. An entry without `=` is a key with an empty value.
pub fn split_env_entry(entry: &str) -> (&str, &str) {
    entry.split_once('=').unwrap_or((entry, ""))
}

/// Computes the environment for a child process.
///
/// Returns `None` when there are no overrides: the child should simply inherit the
/// ambient environment, and no explicit list should be set on the command.
///
/// Otherwise the list holds the overrides (first occurrence of a key wins) followed by
/// every ambient variable whose key was not overridden.
pub fn resolve_environment(
    overrides: &[String],
    ambient: &dyn EnvironmentSource,
) -> Option<Vec<(OsString, OsString)>> {
    if overrides.is_empty() {
        return None;
    }

    let mut seen: HashSet<OsString> = HashSet::with_capacity(overrides.len());
    let mut resolved = Vec::with_capacity(overrides.len());

    for entry in overrides {
        let (key, value) = split_env_entry(entry);
        if !entry.contains('=') {
            log::debug!("Environment override '{}' has no '=', using an empty value.", entry);
        }
        if seen.insert(OsString::from(key)) {
            resolved.push((OsString::from(key), OsString::from(value)));
        }
    }

    resolved.extend(
        ambient
            .snapshot()
            .into_iter()
            .filter(|(key, _)| !seen.contains(key)),
    );

    log::trace!(
        "Resolved child environment: {} override(s), {} variable(s) total.",
        seen.len(),
        resolved.len()
    );
    Some(resolved)
}
