//! `${VAR}` substitution applied to the raw config text before parsing.
//!
//! Process definitions commonly need paths like `${HOME}/src/app`, but a
//! shared config must not be able to smuggle secrets into a process's argv.
//! Only allowlisted variables (plus `PAR_MUX_*` and `LC_*`) are resolved unless
//! the config sets `allow_all_env_vars: true`.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Matches `${VAR_NAME}` and `${VAR_NAME:-default}`.
static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-((?:[^}\\]|\\.)*))?}")
        .expect("env-var substitution regex is a compile-time constant and must be valid")
});

/// Matches a top-level `allow_all_env_vars: true` line.
static ALLOW_ALL_ENV_VARS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^allow_all_env_vars:\s*true\s*$")
        .expect("allow_all_env_vars pre-scan regex is a compile-time constant and must be valid")
});

/// Environment variables that may be substituted without opting in.
pub const ALLOWED_ENV_VARS: &[&str] = &[
    "HOME",
    "USER",
    "USERNAME",
    "LOGNAME",
    "USERPROFILE",
    "SHELL",
    "TERM",
    "LANG",
    "PWD",
    "PATH",
    "TMPDIR",
    "TEMP",
    "TMP",
    "XDG_CONFIG_HOME",
    "XDG_DATA_HOME",
    "XDG_STATE_HOME",
    "XDG_CACHE_HOME",
    "XDG_RUNTIME_DIR",
    "HOSTNAME",
    "EDITOR",
    "APPDATA",
    "LOCALAPPDATA",
];

/// Whether `var_name` may be substituted without `allow_all_env_vars`.
pub fn is_env_var_allowed(var_name: &str) -> bool {
    ALLOWED_ENV_VARS.contains(&var_name)
        || var_name.starts_with("PAR_MUX_")
        || var_name.starts_with("LC_")
}

/// Substitute allowlisted `${VAR}` references from the process environment.
///
/// See [`substitute_with`] for the exact rules.
pub fn substitute_variables(input: &str) -> String {
    substitute_variables_with_allowlist(input, false)
}

/// Substitute `${VAR}` references from the process environment, optionally
/// bypassing the allowlist.
pub fn substitute_variables_with_allowlist(input: &str, allow_all: bool) -> String {
    substitute_with(input, allow_all, |name| std::env::var(name).ok())
}

/// Substitute `${VAR}` references using `lookup` to resolve values.
///
/// - `${VAR}` becomes the value of `VAR`; unset variables are left verbatim.
/// - `${VAR:-default}` falls back to `default` (with `\}` unescaped) when unset.
/// - `$${VAR}` is an escape producing the literal `${VAR}`.
/// - Non-allowlisted names are left verbatim and logged unless `allow_all`.
pub fn substitute_with<F>(input: &str, allow_all: bool, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    const ESCAPED: &str = "\x00PAR_MUX_DOLLAR\x00";
    let working = input.replace("$${", ESCAPED);

    let result = ENV_VAR_PATTERN.replace_all(&working, |caps: &Captures| {
        let var_name = &caps[1];

        if !allow_all && !is_env_var_allowed(var_name) {
            log::warn!(
                "Config references non-allowlisted environment variable ${{{var_name}}}; \
                 left as-is. Set `allow_all_env_vars: true` to resolve it."
            );
            return caps[0].to_string();
        }

        lookup(var_name).unwrap_or_else(|| {
            caps.get(2)
                .map(|m| m.as_str().replace("\\}", "}"))
                .unwrap_or_else(|| caps[0].to_string())
        })
    });

    result.replace(ESCAPED, "${")
}

/// Look for `allow_all_env_vars: true` before the YAML has been parsed.
pub(crate) fn pre_scan_allow_all_env_vars(raw_yaml: &str) -> bool {
    ALLOW_ALL_ENV_VARS_PATTERN.is_match(raw_yaml)
}
