//! Environment variable helpers used by the `from_env` constructors
//!
//! Missing variables are `Ok(None)`; present but unparsable ones are an
//! [`DbError::InvalidConfig`] naming the variable.

use crate::error::{DbError, DbResult};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Read a variable, treating empty values as unset
pub fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read a required variable
pub fn env_required(key: &str) -> DbResult<String> {
    env_string(key).ok_or_else(|| DbError::invalid_config(format!("{key} is not set")))
}

/// Read and parse a variable
pub fn env_parse<T>(key: &str) -> DbResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env_string(key) {
        Some(val) => parse_value(key, &val).map(Some),
        None => Ok(None),
    }
}

/// Read a boolean variable (true/false, 1/0, yes/no, on/off)
pub fn env_bool(key: &str) -> DbResult<Option<bool>> {
    match env_string(key) {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(DbError::invalid_config(format!(
                "{key}: invalid boolean value '{val}', expected true/false/1/0/yes/no/on/off"
            ))),
        },
        None => Ok(None),
    }
}

/// Split a comma-separated host list, dropping blanks
pub fn split_hosts(hosts: &str) -> Vec<String> {
    hosts
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_value<T>(key: &str, val: &str) -> DbResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    val.trim()
        .parse::<T>()
        .map_err(|e| DbError::invalid_config(format!("{key}: invalid value '{val}': {e}")))
}
