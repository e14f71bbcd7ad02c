//! Parsing document fragments into resources.
//!
//! A fragment that is not a YAML mapping with a `kind` (malformed YAML, a
//! warning line the renderer printed, a half-rendered template) is never
//! dropped: it becomes a [`Resource::Unknown`] carrying the fragment text
//! unchanged, and the caller gets an [`UnrecognizedFragment`] to log.

use crate::document::split_documents;
use crate::model::{ApiVersionKind, KnownResource, Resource, UnknownResource};
use serde_yaml::Value;
use thiserror::Error;

/// A fragment that could not be parsed as a structured resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "WARN: failed to recognize a resource in stdout/stderr of helm template command output. snapshot it as Unknown ({reason}): \n---\n{raw}\n---"
)]
pub struct UnrecognizedFragment {
    /// Exact fragment text.
    pub raw: String,
    /// Why parsing gave up.
    pub reason: String,
}

impl UnrecognizedFragment {
    fn new(raw: &str, reason: impl Into<String>) -> Self {
        Self {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }

    /// Downgrade into the placeholder resource that keeps the raw text.
    #[must_use]
    pub fn into_resource(self) -> Resource {
        Resource::Unknown(UnknownResource { raw: self.raw })
    }
}

/// Resources parsed from one rendered output, in emission order.
#[derive(Debug, Clone, Default)]
pub struct ParsedOutput {
    pub resources: Vec<Resource>,
    pub unrecognized: Vec<UnrecognizedFragment>,
}

/// Parse a single fragment.
///
/// # Errors
///
/// Returns [`UnrecognizedFragment`] when the fragment is not valid YAML, is
/// not a mapping, or lacks a string `kind`.
pub fn parse_fragment(fragment: &str) -> Result<KnownResource, UnrecognizedFragment> {
    let body: Value = serde_yaml::from_str(fragment)
        .map_err(|e| UnrecognizedFragment::new(fragment, e.to_string()))?;

    let Value::Mapping(map) = &body else {
        return Err(UnrecognizedFragment::new(fragment, "not a mapping"));
    };

    let kind = match map.get("kind") {
        Some(Value::String(kind)) if !kind.trim().is_empty() => kind.clone(),
        Some(_) => return Err(UnrecognizedFragment::new(fragment, "kind is not a string")),
        None => return Err(UnrecognizedFragment::new(fragment, "missing kind")),
    };
    let api_version = match map.get("apiVersion") {
        Some(Value::String(v)) => v.clone(),
        None | Some(Value::Null) => String::new(),
        Some(_) => {
            return Err(UnrecognizedFragment::new(
                fragment,
                "apiVersion is not a string",
            ));
        }
    };

    let metadata = map.get("metadata");
    let name = metadata_field(metadata, "name");
    let namespace = metadata_field(metadata, "namespace");

    Ok(KnownResource {
        api_version_kind: ApiVersionKind::new(api_version, kind),
        namespace,
        name,
        body,
    })
}

fn metadata_field(metadata: Option<&Value>, key: &str) -> Option<String> {
    metadata
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Parse every fragment of `rendered`, downgrading failures to unknowns.
#[must_use]
pub fn parse_resources(rendered: &str) -> ParsedOutput {
    let mut out = ParsedOutput::default();
    for fragment in split_documents(rendered) {
        match parse_fragment(fragment) {
            Ok(resource) => out.resources.push(Resource::Known(resource)),
            Err(unrecognized) => {
                out.resources.push(unrecognized.clone().into_resource());
                out.unrecognized.push(unrecognized);
            }
        }
    }
    out
}
