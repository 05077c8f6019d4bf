//! Environment variable substitution for config text.
//!
//! - `$VAR` / `${VAR}`: value of `VAR`, an error when unset
//! - `${VAR:-fallback}`: `fallback` when `VAR` is unset or empty
//! - `${VAR-fallback}`: `fallback` only when `VAR` is unset
//! - `$$`: a literal `$`

use std::env;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static VAR_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$
        |
        \$\{ ([A-Za-z_][A-Za-z0-9_]*) (?: (:?-) ([^}]*) )? \}
        |
        \$([A-Za-z_][A-Za-z0-9_]*)
        ",
    )
    .expect("variable reference pattern is valid")
});

/// Substituted text plus every reference that could not be resolved.
#[derive(Debug)]
pub struct Interpolated {
    pub text: String,
    pub errors: Vec<String>,
}

impl Interpolated {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Substitute environment variable references in `input`.
///
/// Unresolved references are left in place and all of them are reported.
pub fn interpolate(input: &str) -> Interpolated {
    let mut errors = Vec::new();

    let text = VAR_REFERENCE
        .replace_all(input, |caps: &Captures| {
            let reference = &caps[0];
            if reference == "$$" {
                return "$".to_string();
            }

            let name = caps
                .get(1)
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            let operator = caps.get(2).map(|m| m.as_str());
            let fallback = caps.get(3).map(|m| m.as_str());

            match env::var(name) {
                Ok(value) if value.contains(['\n', '\r']) => {
                    errors.push(format!("environment variable '{name}' contains a newline"));
                    reference.to_string()
                }
                Ok(value) if value.is_empty() && operator == Some(":-") => {
                    fallback.unwrap_or_default().to_string()
                }
                Ok(value) => value,
                Err(_) => match fallback {
                    Some(fallback) => fallback.to_string(),
                    None => {
                        errors.push(format!("environment variable '{name}' is not set"));
                        reference.to_string()
                    }
                },
            }
        })
        .into_owned();

    Interpolated { text, errors }
}
