//! Templating seam: a read-only data context in, markup out.

use anyhow::{bail, Result};
use serde_json::Value;

pub trait Template {
    fn render(&self, data: &Value) -> Result<String>;
}

impl<F> Template for F
where
    F: Fn(&Value) -> Result<String>,
{
    fn render(&self, data: &Value) -> Result<String> {
        self(data)
    }
}

/// `{{ key }}` substitution over a JSON object. Dotted keys walk nested
/// objects. A missing key is an error rather than an empty string.
#[derive(Debug, Clone)]
pub struct Placeholders {
    source: String,
}

impl Placeholders {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

fn lookup<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(data, |value, part| value.get(part))
}

impl Template for Placeholders {
    fn render(&self, data: &Value) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                bail!("unclosed placeholder in template");
            };
            let key = after[..close].trim();
            match lookup(data, key) {
                Some(Value::String(s)) => out.push_str(s),
                Some(other) => out.push_str(&other.to_string()),
                None => bail!("template key '{key}' missing from data"),
            }
            rest = &after[close + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
