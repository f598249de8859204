//! Request log record sent to the analytics endpoint.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use axum::http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};

/// Metadata for one request. Built once, serialized once, then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLogRecord {
    pub request_path: String,
    pub request_method: String,
    /// Lowercase header names; repeated headers folded with `,`.
    pub request_headers: BTreeMap<String, String>,
}

impl RequestLogRecord {
    pub fn new(path: impl Into<String>, method: &Method, headers: &HeaderMap) -> Self {
        let mut request_headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            let value = String::from_utf8_lossy(value.as_bytes());
            match request_headers.entry(name.as_str().to_string()) {
                Entry::Occupied(mut existing) => {
                    let existing = existing.get_mut();
                    existing.push(',');
                    existing.push_str(&value);
                }
                Entry::Vacant(slot) => {
                    slot.insert(value.into_owned());
                }
            }
        }

        Self {
            request_path: path.into(),
            request_method: method.as_str().to_string(),
            request_headers,
        }
    }

    /// JSON body of the report.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
