use std::{path::Path, sync::OnceLock};

use anyhow::bail;
use indoc::indoc;
use regex::Regex;
use serde::Deserialize;
use std::fmt::Write;
use toml::Value;

use crate::{Config, LlmProviderConfig};

/// Matches `{{ env.NAME }}` placeholders inside string values.
fn env_placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
    })
}

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref().to_path_buf();
    let content = std::fs::read_to_string(&path)?;
    let mut raw_config: Value = toml::from_str(&content)?;

    expand_env_placeholders(&mut Vec::new(), &mut raw_config)?;

    let config = Config::deserialize(raw_config)?;
    validate(&config)?;

    log::debug!("Loaded configuration from {}", path.display());

    Ok(config)
}

pub(crate) fn validate(config: &Config) -> anyhow::Result<()> {
    if config.llm.default_vendor.trim().is_empty() {
        bail!("llm.default_vendor must not be empty");
    }

    if config.llm.provider.vendor().trim().is_empty() {
        bail!("llm.provider.vendor must not be empty");
    }

    if let LlmProviderConfig::Echo(echo) = &config.llm.provider
        && echo.families.is_empty()
    {
        bail!(indoc! {r#"
            The echo provider advertises no models. Relay requires at least one model family to serve completions.

            Example configuration:

              [llm.provider]
              type = "echo"
              vendor = "relay"
              families = ["echo"]
        "#});
    }

    if !config.server.health.path.starts_with('/') {
        bail!(
            "server.health.path must start with '/', got '{}'",
            config.server.health.path
        );
    }

    let cors = &config.server.cors;

    if http::HeaderValue::from_str(&cors.allow_origin).is_err() {
        bail!("server.cors.allow_origin is not a valid header value: '{}'", cors.allow_origin);
    }

    for header in &cors.allow_headers {
        if http::HeaderName::from_bytes(header.as_bytes()).is_err() {
            bail!("server.cors.allow_headers contains an invalid header name: '{header}'");
        }
    }

    Ok(())
}

fn expand_env_placeholders<'a>(path: &mut Vec<Result<&'a str, usize>>, value: &'a mut Value) -> anyhow::Result<()> {
    match value {
        Value::String(s) => {
            if !env_placeholder().is_match(s) {
                return Ok(());
            }

            let mut missing = None;

            let expanded = env_placeholder().replace_all(s, |captures: &regex::Captures<'_>| {
                let name = &captures[1];

                match std::env::var(name) {
                    Ok(value) => value,
                    Err(_) => {
                        missing.get_or_insert_with(|| name.to_string());
                        String::new()
                    }
                }
            });

            if let Some(name) = missing {
                let mut p = String::new();

                for segment in path.iter() {
                    match segment {
                        Ok(s) => {
                            p.push_str(s);
                            p.push('.');
                        }
                        Err(i) => write!(p, "[{i}]")?,
                    }
                }

                if p.ends_with('.') {
                    p.pop();
                }

                bail!("Failed to expand placeholder at path '{p}': environment variable '{name}' is not set");
            }

            *s = expanded.into_owned();
        }
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_env_placeholders(path, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map {
                path.push(Ok(key.as_str()));
                expand_env_placeholders(path, value)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}
