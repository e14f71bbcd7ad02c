//! Masking of non-deterministic fields.
//!
//! Charts that call `randAlphaNum`, `now` or generate certificates render a
//! different value on every run. Each `testSpec.dynamicFields` rule selects
//! resources by apiVersion/kind (and optionally name) and lists RFC 6901
//! JSON pointers; the value at every pointer that resolves is replaced by
//! [`DYNAMIC_FIELD_PLACEHOLDER`] before the snapshot is produced.

use crate::model::{DynamicFieldMask, Resource};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// Value written over every masked field.
pub const DYNAMIC_FIELD_PLACEHOLDER: &str = "###DYNAMIC_FIELD###";

/// A parsed JSON pointer such as `/data/token` or `/spec/containers/0/image`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JsonPointer {
    raw: String,
    segments: Vec<String>,
}

impl JsonPointer {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Replace the value this pointer addresses in `root`.
    ///
    /// Returns `false` (leaving `root` untouched) when the pointer does not
    /// resolve.
    pub fn replace(&self, root: &mut Value, replacement: &Value) -> bool {
        let mut current = root;
        for segment in &self.segments {
            match step(current, segment) {
                Some(next) => current = next,
                None => return false,
            }
        }
        *current = replacement.clone();
        true
    }
}

fn step<'v>(value: &'v mut Value, segment: &str) -> Option<&'v mut Value> {
    match value {
        Value::Mapping(map) => map.get_mut(segment),
        Value::Sequence(seq) => {
            // RFC 6901: no leading zeros, "-" never resolves to an element
            if segment.len() > 1 && segment.starts_with('0') {
                return None;
            }
            let index: usize = segment.parse().ok()?;
            seq.get_mut(index)
        }
        Value::Tagged(tagged) => step(&mut tagged.value, segment),
        _ => None,
    }
}

impl FromStr for JsonPointer {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(format!("json pointer '{raw}' must start with '/'"));
        };
        let segments = rest
            .split('/')
            .map(|s| s.replace("~1", "/").replace("~0", "~"))
            .collect();
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }
}

impl TryFrom<String> for JsonPointer {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<JsonPointer> for String {
    fn from(pointer: JsonPointer) -> Self {
        pointer.raw
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Apply every rule, in order, to every matching structured resource.
///
/// Returns how many field replacements were made.
pub fn apply_masks(resources: &mut [Resource], rules: &[DynamicFieldMask]) -> usize {
    let placeholder = Value::String(DYNAMIC_FIELD_PLACEHOLDER.to_string());
    let mut masked = 0;
    for rule in rules {
        for resource in resources.iter_mut() {
            let Resource::Known(known) = resource else {
                continue;
            };
            if !rule.matches(known) {
                continue;
            }
            for pointer in &rule.json_paths {
                if pointer.replace(&mut known.body, &placeholder) {
                    masked += 1;
                    debug!(
                        resource = %resource_label(known),
                        path = %pointer,
                        "Masked dynamic field"
                    );
                } else {
                    trace!(
                        resource = %resource_label(known),
                        path = %pointer,
                        "Dynamic field path did not resolve"
                    );
                }
            }
        }
    }
    masked
}

fn resource_label(known: &crate::model::KnownResource) -> String {
    format!(
        "{} {}",
        known.api_version_kind,
        known.name.as_deref().unwrap_or_default()
    )
}
