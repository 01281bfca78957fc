// Copyright 2026 hotcache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Policy parameters are passed as flat `key=value,key=value` text.
//!
//! Keys are case-insensitive and surrounding whitespace is ignored. The bare key `print` asks the policy to report its
//! effective parameters instead of building a cache.

use std::str::FromStr;

use crate::error::{Error, ErrorKind, Result};

/// The key that requests a parameter listing.
pub const PRINT_KEY: &str = "print";

/// One parsed `key=value` pair. `key` is lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Lower-cased key.
    pub key: String,
    /// Raw value, empty for bare keys.
    pub value: String,
}

impl Param {
    /// Whether this is the `print` request.
    pub fn is_print(&self) -> bool {
        self.key == PRINT_KEY
    }

    /// Parse the value as `T`.
    pub fn parse<T>(&self) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.value
            .parse::<T>()
            .map_err(|e| Error::parse_param(&self.key, &self.value, e))
    }
}

/// Split parameter text into pairs.
///
/// Empty segments are skipped. A key without `=` is only accepted for `print`.
pub fn parse_params(text: &str) -> Result<Vec<Param>> {
    text.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = match segment.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (segment, ""),
            };
            let key = key.to_ascii_lowercase();
            if value.is_empty() && key != PRINT_KEY {
                return Err(Error::new(ErrorKind::Parse, "parameter without value").with_context("key", key));
            }
            Ok(Param {
                key,
                value: value.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        let params = parse_params("K=2, Batch-Size = 32 ,,print").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].key, "k");
        assert_eq!(params[0].parse::<usize>().unwrap(), 2);
        assert_eq!(params[1].key, "batch-size");
        assert_eq!(params[1].value, "32");
        assert!(params[2].is_print());
    }

    #[test]
    fn test_parse_params_empty() {
        assert!(parse_params("").unwrap().is_empty());
        assert!(parse_params("  ").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_value() {
        let params = parse_params("k=two").unwrap();
        let err = params[0].parse::<usize>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = parse_params("k").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
