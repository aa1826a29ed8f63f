//! Strict option parsing for raw plugin parameter strings.
//!
//! A parameter string is split on whitespace and read as a sequence of
//! single-value options (`-name value`, `--name value`, `-name=value`).
//! Every option must be one of the names the caller recognizes.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown option: -{0}")]
    UnknownOption(String),

    #[error("option needs a value: -{0}")]
    MissingValue(String),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),

    #[error("bad option syntax: {0}")]
    BadSyntax(String),

    #[error("invalid value {value:?} for -{option}")]
    InvalidValue { option: String, value: String },
}

/// Parse `args` against the recognized option `keys`.
///
/// The returned map contains every key; options absent from `args` map to an
/// empty string. Repeating an option keeps the last value.
pub fn parse_args<S: AsRef<str>>(
    args: &str,
    keys: &[S],
) -> Result<HashMap<String, String>, ParseError> {
    let mut values: HashMap<String, String> = keys
        .iter()
        .map(|key| (key.as_ref().to_string(), String::new()))
        .collect();

    let mut tokens = args.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "--" {
            // Nothing may follow the terminator.
            return match tokens.next() {
                Some(extra) => Err(ParseError::UnexpectedArgument(extra.to_string())),
                None => Ok(values),
            };
        }

        let (name, inline) = split_option(token)?;
        let slot = values
            .get_mut(name)
            .ok_or_else(|| ParseError::UnknownOption(name.to_string()))?;

        *slot = match inline {
            Some(value) => value.to_string(),
            None => tokens
                .next()
                .ok_or_else(|| ParseError::MissingValue(name.to_string()))?
                .to_string(),
        };
    }

    Ok(values)
}

/// Split an option token into its name and an optional `=value` part.
fn split_option(token: &str) -> Result<(&str, Option<&str>), ParseError> {
    let body = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))
        .ok_or_else(|| ParseError::UnexpectedArgument(token.to_string()))?;

    if body.is_empty() || body.starts_with('-') || body.starts_with('=') {
        return Err(ParseError::BadSyntax(token.to_string()));
    }

    Ok(match body.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (body, None),
    })
}

/// Split a comma separated option value, dropping empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
