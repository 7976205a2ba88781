use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Matches `{{ env.VAR }}` and `{{ env.VAR | default("fallback") }}`
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\)\s*)?\}\}"#).expect("must be valid regex")
    })
}

/// Substitute environment placeholders in raw config text
///
/// Runs before TOML parsing so that every config field can be a plain
/// value. Comment lines are copied through untouched, which lets example
/// configs mention variables that are not set.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut expanded: Vec<String> = Vec::new();

    for line in input.split('\n') {
        if line.trim_start().starts_with('#') || !line.contains("{{") {
            expanded.push(line.to_owned());
            continue;
        }

        let mut failure = None;
        let replaced = placeholder().replace_all(line, |caps: &Captures<'_>| {
            resolve(caps).unwrap_or_else(|e| {
                failure.get_or_insert(e);
                String::new()
            })
        });

        if let Some(e) = failure {
            return Err(e);
        }

        expanded.push(replaced.into_owned());
    }

    Ok(expanded.join("\n"))
}

fn resolve(caps: &Captures<'_>) -> Result<String, String> {
    let key = &caps[1];
    let fallback = caps.get(2).as_ref().map(regex::Match::as_str);

    let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.is_empty() && !name.contains('.')) else {
        return Err(format!("unsupported placeholder `{key}`, expected `env.NAME`"));
    };

    match (std::env::var(var_name), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_owned()),
        (Err(_), None) => Err(format!("environment variable not found: `{var_name}`")),
    }
}
