//! Core data types for `chartsnap`.
//!
//! - `ApiVersionKind` - schema family + type of a rendered resource
//! - `Resource` - one rendered document, either structured or unknown
//! - `TestSpec` / `DynamicFieldMask` - per-values-file test metadata
//! - `TestCase` - one unit of work for the orchestrator

use crate::mask::JsonPointer;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// Group/version and kind identifying a resource's schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVersionKind {
    #[serde(default)]
    pub api_version: String,
    pub kind: String,
}

impl ApiVersionKind {
    #[must_use]
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }

    /// Identity used for fragments that could not be parsed.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_API_VERSION, UNKNOWN_KIND)
    }
}

impl fmt::Display for ApiVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.api_version.is_empty() {
            f.write_str(&self.kind)
        } else {
            write!(f, "{}/{}", self.api_version, self.kind)
        }
    }
}

/// apiVersion reported for unknown resources.
pub const UNKNOWN_API_VERSION: &str = "chartsnap.dev/v1alpha1";
/// kind reported for unknown resources.
pub const UNKNOWN_KIND: &str = "Unknown";

/// A fragment that parsed as a structured resource.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownResource {
    pub api_version_kind: ApiVersionKind,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub body: Value,
}

/// A fragment preserved verbatim because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResource {
    pub raw: String,
}

/// One rendered unit of output.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Known(KnownResource),
    Unknown(UnknownResource),
}

impl Resource {
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Known(r) => r.name.as_deref(),
            Self::Unknown(_) => None,
        }
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::Known(r) => r.namespace.as_deref(),
            Self::Unknown(_) => None,
        }
    }

    /// Short identity for log lines, e.g. `v1/Secret testns/app`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Known(r) => {
                let mut out = r.api_version_kind.to_string();
                match (&r.namespace, &r.name) {
                    (Some(ns), Some(name)) => out.push_str(&format!(" {ns}/{name}")),
                    (None, Some(name)) => out.push_str(&format!(" {name}")),
                    _ => {}
                }
                out
            }
            Self::Unknown(_) => ApiVersionKind::unknown().to_string(),
        }
    }

    /// Total order used before serialization.
    ///
    /// Structured resources order by apiVersionKind, namespace, then name
    /// (absent sorts first). Unknown resources sort after all structured
    /// ones, by raw text.
    #[must_use]
    pub fn cmp_identity(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Known(a), Self::Known(b)) => a
                .api_version_kind
                .cmp(&b.api_version_kind)
                .then_with(|| a.namespace.cmp(&b.namespace))
                .then_with(|| a.name.cmp(&b.name)),
            (Self::Known(_), Self::Unknown(_)) => Ordering::Less,
            (Self::Unknown(_), Self::Known(_)) => Ordering::Greater,
            (Self::Unknown(a), Self::Unknown(b)) => a.raw.cmp(&b.raw),
        }
    }
}

/// Masking rule from `testSpec.dynamicFields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicFieldMask {
    #[serde(flatten)]
    pub api_version_kind: ApiVersionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "jsonPath", default)]
    pub json_paths: Vec<JsonPointer>,
}

impl DynamicFieldMask {
    /// Does this rule select `resource`?
    #[must_use]
    pub fn matches(&self, resource: &KnownResource) -> bool {
        if resource.api_version_kind != self.api_version_kind {
            return false;
        }
        match &self.name {
            Some(name) => resource.name.as_deref() == Some(name.as_str()),
            None => true,
        }
    }
}

/// Optional test metadata embedded in a values file under `testSpec`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default)]
    pub dynamic_fields: Vec<DynamicFieldMask>,
}

/// One unit of work: a chart rendered with one values input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub chart: PathBuf,
    /// `None` renders the chart with its default values.
    pub values: Option<PathBuf>,
    pub spec: TestSpec,
    pub snapshot: PathBuf,
}

impl TestCase {
    /// `chart=... values=...` label used in banners and logs.
    #[must_use]
    pub fn label(&self) -> String {
        case_label(&self.chart, self.values.as_deref())
    }
}

/// Label for a chart/values pair, shared by cases that failed to resolve.
#[must_use]
pub fn case_label(chart: &std::path::Path, values: Option<&std::path::Path>) -> String {
    format!(
        "chart={} values={}",
        chart.display(),
        values.map(|v| v.display().to_string()).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(avk: ApiVersionKind, ns: Option<&str>, name: Option<&str>) -> Resource {
        Resource::Known(KnownResource {
            api_version_kind: avk,
            namespace: ns.map(ToString::to_string),
            name: name.map(ToString::to_string),
            body: Value::Null,
        })
    }

    #[test]
    fn test_api_version_kind_display() {
        assert_eq!(ApiVersionKind::new("v1", "Secret").to_string(), "v1/Secret");
        assert_eq!(ApiVersionKind::new("", "ConfigMap").to_string(), "ConfigMap");
        assert_eq!(
            ApiVersionKind::unknown().to_string(),
            "chartsnap.dev/v1alpha1/Unknown"
        );
    }

    #[test]
    fn test_identity_order_absent_sorts_first() {
        let avk = ApiVersionKind::new("v1", "Service");
        let no_ns = known(avk.clone(), None, Some("b"));
        let with_ns = known(avk.clone(), Some("a"), Some("a"));
        let no_name = known(avk, Some("a"), None);
        assert_eq!(no_ns.cmp_identity(&with_ns), Ordering::Less);
        assert_eq!(no_name.cmp_identity(&with_ns), Ordering::Less);
    }

    #[test]
    fn test_unknown_sorts_after_known() {
        let unknown = Resource::Unknown(UnknownResource {
            raw: "WARNING".to_string(),
        });
        let svc = known(ApiVersionKind::new("v1", "Service"), None, Some("x"));
        assert_eq!(unknown.cmp_identity(&svc), Ordering::Greater);
        assert!(unknown.is_unknown());
        assert_eq!(unknown.name(), None);
    }

    #[test]
    fn test_mask_matches_by_kind_and_optional_name() {
        let rule: DynamicFieldMask = serde_yaml::from_str(
            "apiVersion: v1\nkind: Secret\njsonPath:\n  - /data/token\n",
        )
        .unwrap();
        let secret = KnownResource {
            api_version_kind: ApiVersionKind::new("v1", "Secret"),
            namespace: None,
            name: Some("anything".to_string()),
            body: Value::Null,
        };
        assert!(rule.matches(&secret));

        let named = DynamicFieldMask {
            name: Some("other".to_string()),
            ..rule
        };
        assert!(!named.matches(&secret));
    }

    #[test]
    fn test_test_spec_defaults() {
        let spec: TestSpec = serde_yaml::from_str("desc: only defaults\n").unwrap();
        assert_eq!(spec.desc.as_deref(), Some("only defaults"));
        assert!(spec.dynamic_fields.is_empty());
    }
}
