//! # Fallback Resolver
//! Turns a fetch result into something displayable, or an explicit no-data
//! outcome.
//!
//! Order: live/cached result → persisted snapshot file → static default →
//! `NoData`. The persisted file is read-only here; it is produced offline.

use std::fs;
use std::path::{Path, PathBuf};

use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FetchError;
use crate::fetch::unwrap_document;
use crate::snapshot::{MarketSnapshot, Provenance};

/// What to substitute when the live fetch fails.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackPolicy {
    /// Read a persisted snapshot (single object or sequence, first record wins).
    File(PathBuf),
    /// Serve a built-in payload tagged `Default`.
    Static(Map<String, Value>),
    /// No substitute: failures become `NoData`.
    Nothing,
}

/// Outcome of one resolve step. Never an `Err`: the no-data state is a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Ready {
        snapshot: MarketSnapshot,
        /// The live failure that forced a degraded snapshot, if any.
        error: Option<FetchError>,
    },
    NoData {
        source_id: String,
        error: FetchError,
    },
}

impl Resolution {
    pub fn snapshot(&self) -> Option<&MarketSnapshot> {
        match self {
            Resolution::Ready { snapshot, .. } => Some(snapshot),
            Resolution::NoData { .. } => None,
        }
    }

    pub fn provenance(&self) -> Option<Provenance> {
        self.snapshot().map(|s| s.provenance)
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Resolution::Ready { error, .. } => error.as_ref(),
            Resolution::NoData { error, .. } => Some(error),
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Resolution::NoData { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FallbackResolver {
    policy: FallbackPolicy,
}

impl FallbackResolver {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self { policy }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FallbackPolicy::File(path.into()))
    }

    pub fn none() -> Self {
        Self::new(FallbackPolicy::Nothing)
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    pub fn resolve(
        &self,
        source_id: &str,
        fetch_result: Result<MarketSnapshot, FetchError>,
    ) -> Resolution {
        let error = match fetch_result {
            Ok(snapshot) => return Resolution::Ready { snapshot, error: None },
            Err(e) => e,
        };
        counter!(
            "snapshot_fetch_errors_total",
            "source" => source_id.to_string(),
            "kind" => error.kind().as_str()
        )
        .increment(1);

        let substitute = match &self.policy {
            FallbackPolicy::File(path) => match load_persisted(path) {
                Ok(payload) => Some((payload, Provenance::FallbackFile)),
                Err(file_err) => {
                    tracing::warn!(
                        target: "fallback",
                        source = source_id,
                        path = %path.display(),
                        error = %file_err,
                        "fallback file unusable"
                    );
                    None
                }
            },
            FallbackPolicy::Static(payload) => Some((payload.clone(), Provenance::Default)),
            FallbackPolicy::Nothing => None,
        };

        match substitute {
            Some((payload, provenance)) => {
                tracing::warn!(
                    target: "fallback",
                    source = source_id,
                    provenance = provenance.as_str(),
                    error = %error,
                    "live fetch failed; serving degraded snapshot"
                );
                counter!(
                    "snapshot_degraded_total",
                    "source" => source_id.to_string(),
                    "provenance" => provenance.as_str()
                )
                .increment(1);
                Resolution::Ready {
                    snapshot: MarketSnapshot::new(source_id, payload, provenance),
                    error: Some(error),
                }
            }
            None => {
                counter!("snapshot_no_data_total", "source" => source_id.to_string()).increment(1);
                Resolution::NoData {
                    source_id: source_id.to_string(),
                    error,
                }
            }
        }
    }
}

/// Convenience form of the file policy.
pub fn resolve(
    source_id: &str,
    fetch_result: Result<MarketSnapshot, FetchError>,
    persisted_path: &Path,
) -> Resolution {
    FallbackResolver::file(persisted_path).resolve(source_id, fetch_result)
}

/// Reads and unwraps a persisted snapshot file.
pub fn load_persisted(path: &Path) -> Result<Map<String, Value>, FetchError> {
    let content = fs::read_to_string(path)
        .map_err(|e| FetchError::NoData(format!("reading {}: {e}", path.display())))?;
    let doc: Value = serde_json::from_str(&content)?;
    unwrap_document(doc)
}

/// Serializable view of a resolution error for API consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorView {
    pub kind: crate::error::FetchErrorKind,
    pub detail: String,
}

impl From<&FetchError> for ErrorView {
    fn from(e: &FetchError) -> Self {
        Self {
            kind: e.kind(),
            detail: e.detail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn live() -> MarketSnapshot {
        let mut m = Map::new();
        m.insert("market_state".into(), json!({ "macro_regime": "inflationary" }));
        MarketSnapshot::new("narrative_webhook", m, Provenance::Live)
    }

    fn unreachable() -> FetchError {
        FetchError::Unreachable("dns error".into())
    }

    #[test]
    fn success_passes_through_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let snap = live();
        let r = resolve("narrative_webhook", Ok(snap.clone()), &dir.path().join("none.json"));
        assert_eq!(
            r,
            Resolution::Ready {
                snapshot: snap,
                error: None
            }
        );
    }

    #[test]
    fn failure_with_list_file_uses_first_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(
            &path,
            r#"[{"trading_signal":{"signal":"hold"}},{"trading_signal":{"signal":"sell"}}]"#,
        )
        .unwrap();

        let r = resolve("narrative_webhook", Err(unreachable()), &path);
        let snap = r.snapshot().expect("fallback snapshot");
        assert_eq!(snap.provenance, Provenance::FallbackFile);
        assert_eq!(snap.payload["trading_signal"]["signal"], json!("hold"));
        assert_eq!(r.error(), Some(&unreachable()));
    }

    #[test]
    fn failure_with_object_file_uses_it_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, r#"{"macro_pressure_index":{"inflation_pressure":0.6}}"#).unwrap();

        let r = resolve("narrative_webhook", Err(unreachable()), &path);
        let snap = r.snapshot().unwrap();
        assert_eq!(
            Value::Object(snap.payload.clone()),
            json!({"macro_pressure_index":{"inflation_pressure":0.6}})
        );
    }

    #[test]
    fn failure_without_file_is_no_data_with_original_error() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolve(
            "narrative_webhook",
            Err(unreachable()),
            &dir.path().join("missing.json"),
        );
        assert_eq!(
            r,
            Resolution::NoData {
                source_id: "narrative_webhook".into(),
                error: unreachable()
            }
        );
    }

    #[test]
    fn failure_with_corrupt_or_empty_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ truncated").unwrap();
        assert!(resolve("narrative_webhook", Err(unreachable()), &bad).is_no_data());

        let empty = dir.path().join("empty.json");
        fs::write(&empty, "[]").unwrap();
        assert!(resolve("narrative_webhook", Err(unreachable()), &empty).is_no_data());
    }

    #[test]
    fn static_policy_tags_default() {
        let mut payload = Map::new();
        payload.insert("instruments".into(), json!([]));
        let r = FallbackResolver::new(FallbackPolicy::Static(payload))
            .resolve("market_pulse", Err(unreachable()));
        assert_eq!(r.provenance(), Some(Provenance::Default));
        assert!(r.error().is_some());
    }

    #[test]
    fn nothing_policy_is_no_data() {
        let r = FallbackResolver::none().resolve("silver_history", Err(unreachable()));
        assert!(r.is_no_data());
        assert_eq!(r.provenance(), None);
    }
}
