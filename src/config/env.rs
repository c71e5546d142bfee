use std::env::VarError;
use std::time::Duration;

use ::config::Map;
use humantime::parse_duration;

use crate::error::ConfigError;

/// Where environment overrides come from. The process environment unless a
/// fixed set of variables was supplied.
#[derive(Debug, Default)]
pub(super) struct EnvSource {
    fixed: Option<Map<String, String>>,
}

impl EnvSource {
    pub(super) fn process() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(super) fn fixed<'a>(vars: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            fixed: Some(
                vars.into_iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            ),
        }
    }

    /// Variables for the `config` crate's environment source; `None` reads the process.
    pub(super) fn snapshot(&self) -> Option<Map<String, String>> {
        self.fixed.clone()
    }

    fn var(&self, key: &'static str) -> Result<String, VarError> {
        match &self.fixed {
            Some(vars) => vars.get(key).cloned().ok_or(VarError::NotPresent),
            None => std::env::var(key),
        }
    }

    pub(super) fn string(&self, key: &'static str) -> Result<Option<String>, ConfigError> {
        match self.var(key) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(ConfigError::EnvEncoding { key }),
        }
    }

    pub(super) fn parse<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(key)?
            .map(|value| {
                value
                    .parse::<T>()
                    .map_err(|err| ConfigError::invalid(key, err.to_string()))
            })
            .transpose()
    }

    pub(super) fn boolean(&self, key: &'static str) -> Result<Option<bool>, ConfigError> {
        self.string(key)?
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "y" | "on" => Ok(true),
                "0" | "false" | "no" | "n" | "off" => Ok(false),
                other => Err(ConfigError::invalid(key, format!("not a boolean: {other}"))),
            })
            .transpose()
    }

    /// Accepts humantime strings ("3s", "1500ms") as well as bare milliseconds.
    pub(super) fn duration(&self, key: &'static str) -> Result<Option<Duration>, ConfigError> {
        self.string(key)?
            .map(|value| {
                value.parse::<u64>().map_or_else(
                    |_| parse_duration(&value).map_err(|err| ConfigError::invalid(key, err.to_string())),
                    |ms| Ok(Duration::from_millis(ms)),
                )
            })
            .transpose()
    }
}
