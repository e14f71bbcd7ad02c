//! Turning raw rendered output into snapshot text.
//!
//! Pipeline: split → parse → mask → order → serialize. The result only
//! depends on the set of rendered resources, not on the order the renderer
//! emitted them in, and mapping keys are emitted sorted so that template
//! key order does not leak into the snapshot either.

use crate::error::Result;
use crate::mask::apply_masks;
use crate::model::{Resource, TestSpec};
use crate::resource::{UnrecognizedFragment, parse_resources};
use serde_yaml::{Mapping, Value};

/// Separator written between documents of a snapshot.
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// Outcome of normalizing one rendered output.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Snapshot text.
    pub text: String,
    /// Number of resources in the snapshot.
    pub resources: usize,
    /// Fragments kept verbatim as unknown resources.
    pub unrecognized: Vec<UnrecognizedFragment>,
    /// Number of dynamic field replacements made.
    pub masked_fields: usize,
}

/// Run the whole normalization pipeline over `rendered`.
///
/// # Errors
///
/// Returns an error only if a parsed resource cannot be emitted as YAML.
pub fn normalize(rendered: &str, spec: &TestSpec) -> Result<Normalized> {
    let parsed = parse_resources(rendered);
    let mut resources = parsed.resources;
    let masked_fields = apply_masks(&mut resources, &spec.dynamic_fields);
    let count = resources.len();
    let text = serialize_resources(resources)?;
    Ok(Normalized {
        text,
        resources: count,
        unrecognized: parsed.unrecognized,
        masked_fields,
    })
}

/// Order resources and join their serialized forms into one text.
///
/// # Errors
///
/// Returns an error if a structured resource cannot be emitted as YAML.
pub fn serialize_resources(resources: Vec<Resource>) -> Result<String> {
    let mut entries = resources
        .into_iter()
        .map(|resource| {
            let text = serialize_resource(&resource)?;
            Ok((resource, text))
        })
        .collect::<Result<Vec<_>>>()?;

    // Identical identities (e.g. duplicate names) fall back to the text so
    // the order stays total.
    entries.sort_by(|(a, a_text), (b, b_text)| {
        a.cmp_identity(b).then_with(|| a_text.cmp(b_text))
    });

    let texts: Vec<String> = entries.into_iter().map(|(_, text)| text).collect();
    Ok(texts.join(DOCUMENT_SEPARATOR))
}

/// Serialize one resource; unknown resources are emitted verbatim.
///
/// The result always ends with a newline.
///
/// # Errors
///
/// Returns an error if the structured body cannot be emitted as YAML.
pub fn serialize_resource(resource: &Resource) -> Result<String> {
    let mut text = match resource {
        Resource::Known(known) => serde_yaml::to_string(&canonicalize(&known.body))?,
        Resource::Unknown(unknown) => unknown.raw.clone(),
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

/// Recursively sort mapping keys.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut entries: Vec<(String, &Value, &Value)> = map
                .iter()
                .map(|(k, v)| (key_text(k), k, v))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = Mapping::with_capacity(entries.len());
            for (_, k, v) in entries {
                out.insert(k.clone(), canonicalize(v));
            }
            Value::Mapping(out)
        }
        Value::Sequence(seq) => Value::Sequence(seq.iter().map(canonicalize).collect()),
        Value::Tagged(tagged) => {
            let mut tagged = tagged.clone();
            tagged.value = canonicalize(&tagged.value);
            Value::Tagged(tagged)
        }
        other => other.clone(),
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}
