//! The URL query component of an announce request, kept as raw
//! percent-encoded strings.
//!
//! The standard form extractors assume UTF-8 values; `info_hash` and
//! `peer_id` are percent encoded binary, so the query string is split
//! without decoding and each param is decoded by whoever consumes it.
use std::collections::HashMap;
use std::panic::Location;
use std::str::FromStr;

use thiserror::Error;

type ParamName = String;
type ParamValue = String;

/// A parsed URL query component: parameter names mapped to their (possibly
/// repeated) raw values.
#[derive(Debug)]
pub struct Query {
    params: HashMap<ParamName, Vec<ParamValue>>,
}

impl Query {
    /// The first value of the param with the given name, if present.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<String> {
        self.params.get(name).and_then(|values| values.first().cloned())
    }

    /// All values of the param with the given name, if present.
    #[must_use]
    pub fn get_param_vec(&self, name: &str) -> Option<Vec<String>> {
        self.params.get(name).cloned()
    }
}

/// Error returned when parsing a [`Query`] from a string.
#[derive(Error, Debug)]
pub enum ParseQueryError {
    /// Invalid URL query param, e.g. `"name=value=value"` with an
    /// unescaped `=`.
    #[error("invalid param {raw_param} in {location}")]
    InvalidParam {
        location: &'static Location<'static>,
        raw_param: String,
    },
}

impl FromStr for Query {
    type Err = ParseQueryError;

    fn from_str(raw_query: &str) -> Result<Self, Self::Err> {
        let mut params: HashMap<ParamName, Vec<ParamValue>> = HashMap::new();

        for raw_param in raw_query.trim().trim_start_matches('?').split('&') {
            let mut pair = raw_param.split('=');

            let (name, value) = match (pair.next(), pair.next(), pair.next()) {
                (Some(name), Some(value), None) if !name.is_empty() => (name, value),
                _ => {
                    return Err(ParseQueryError::InvalidParam {
                        location: Location::caller(),
                        raw_param: raw_param.to_owned(),
                    })
                }
            };

            params.entry(name.to_owned()).or_default().push(value.to_owned());
        }

        Ok(Self { params })
    }
}

impl From<Vec<(&str, &str)>> for Query {
    fn from(raw_params: Vec<(&str, &str)>) -> Self {
        let mut params: HashMap<ParamName, Vec<ParamValue>> = HashMap::new();

        for (name, value) in raw_params {
            params.entry(name.to_owned()).or_default().push(value.to_owned());
        }

        Self { params }
    }
}
