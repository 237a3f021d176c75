//! Playlist export
//!
//! Turns each non-empty tier into a playlist on the backing service. Names
//! are validated for every tier before the first network call; tiers are then
//! exported one at a time, in tier order, through a [`PlaylistExporter`].
//! A failure is recorded for its tier and the loop moves on, so the report
//! may mix successes and failures.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::registry::{TierId, TierRegistry};

/// Message used when no tier holds any track
pub const NOTHING_TO_EXPORT: &str = "No tiers with songs to save.";

/// Failure reported by the backing service for one playlist
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ExportFailure(pub String);

/// Collaborator that materializes a playlist
#[async_trait]
pub trait PlaylistExporter: Send + Sync {
    /// Create a playlist named `name` holding `uris`, returning its external URL
    async fn create_playlist(&self, name: &str, uris: &[String]) -> Result<String, ExportFailure>;
}

/// Errors that stop an export before any playlist is created
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("No tiers with songs to save.")]
    NothingToExport,

    #[error("Every tier needs a label before saving")]
    BlankLabel { tier_id: TierId },

    #[error("Please enter a name for Tier {tier}")]
    BlankName { tier: String },
}

/// One tier scheduled for export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedExport {
    pub tier_id: TierId,
    /// Tier label, upper-cased
    pub label: String,
    /// User-chosen playlist name
    pub name: String,
    /// Track URIs in tier order
    pub uris: Vec<String>,
}

/// Playlist names and contents for every tier to export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportPlan {
    entries: Vec<PlannedExport>,
}

/// Default playlist name offered for a tier
pub fn default_playlist_name(label: &str) -> String {
    format!("My {} Tier Playlist", label.to_uppercase())
}

impl ExportPlan {
    pub fn new(entries: Vec<PlannedExport>) -> Self {
        Self { entries }
    }

    /// Plan every non-empty tier with its default playlist name
    pub fn from_registry(registry: &TierRegistry) -> Result<Self, ExportError> {
        let entries: Vec<PlannedExport> = registry
            .tiers()
            .iter()
            .filter(|tier| !tier.is_empty())
            .map(|tier| {
                let label = tier.label().to_uppercase();
                PlannedExport {
                    tier_id: tier.id(),
                    name: default_playlist_name(&label),
                    label,
                    uris: registry.tier_uris(tier.id()).unwrap_or_default(),
                }
            })
            .collect();

        if entries.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        if let Some(entry) = entries.iter().find(|e| e.label.trim().is_empty()) {
            return Err(ExportError::BlankLabel { tier_id: entry.tier_id });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PlannedExport] {
        &self.entries
    }

    /// Set the playlist name for a tier; returns false if the tier is not planned
    pub fn set_name(&mut self, tier_id: TierId, name: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.tier_id == tier_id) {
            Some(entry) => {
                entry.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Every label and name must be non-blank; the first offending tier is reported
    pub fn validate(&self) -> Result<(), ExportError> {
        for entry in &self.entries {
            if entry.label.trim().is_empty() {
                return Err(ExportError::BlankLabel { tier_id: entry.tier_id });
            }
            if entry.name.trim().is_empty() {
                return Err(ExportError::BlankName {
                    tier: entry.label.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Outcome of exporting one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportOutcome {
    Saved { url: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierExportResult {
    pub tier: String,
    pub playlist_name: String,
    #[serde(flatten)]
    pub outcome: ExportOutcome,
}

impl TierExportResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ExportOutcome::Saved { .. })
    }
}

/// Itemized result of an export, one entry per attempted tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub results: Vec<TierExportResult>,
}

impl ExportReport {
    pub fn successes(&self) -> impl Iterator<Item = &TierExportResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TierExportResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Plain-text report with "Successfully saved:" and "Failed to save:" sections
    pub fn summary(&self) -> String {
        let mut out = String::new();

        let saved: Vec<_> = self.successes().collect();
        if !saved.is_empty() {
            out.push_str("Successfully saved:\n");
            for result in saved {
                if let ExportOutcome::Saved { url } = &result.outcome {
                    out.push_str(&format!("  Tier {}: {}\n", result.tier, url));
                }
            }
        }

        let failed: Vec<_> = self.failures().collect();
        if !failed.is_empty() {
            out.push_str("Failed to save:\n");
            for result in failed {
                if let ExportOutcome::Failed { error } = &result.outcome {
                    out.push_str(&format!("  Tier {}: {}\n", result.tier, error));
                }
            }
        }
        out
    }
}

/// Export every planned tier through `exporter`
///
/// Validates all names first; a blank name aborts before any network call.
/// Tiers without URIs are skipped and produce no entry.
pub async fn export_tiers<E>(plan: &ExportPlan, exporter: &E) -> Result<ExportReport, ExportError>
where
    E: PlaylistExporter + ?Sized,
{
    plan.validate()?;

    let mut report = ExportReport::default();
    for entry in plan.entries() {
        if entry.uris.is_empty() {
            continue;
        }

        let name = entry.name.trim();
        let outcome = match exporter.create_playlist(name, &entry.uris).await {
            Ok(url) => {
                info!(tier = %entry.label, tracks = entry.uris.len(), url = %url, "Tier exported");
                ExportOutcome::Saved { url }
            }
            Err(err) => {
                warn!(tier = %entry.label, error = %err, "Tier export failed");
                let error = if err.0.is_empty() {
                    "Unknown error".to_string()
                } else {
                    err.0
                };
                ExportOutcome::Failed { error }
            }
        };

        report.results.push(TierExportResult {
            tier: entry.label.clone(),
            playlist_name: name.to_string(),
            outcome,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Track, TrackId};
    use std::sync::Mutex;

    /// Records calls; fails for names listed in `fail_names`
    #[derive(Default)]
    struct RecordingExporter {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        fail_names: Vec<String>,
    }

    #[async_trait]
    impl PlaylistExporter for RecordingExporter {
        async fn create_playlist(&self, name: &str, uris: &[String]) -> Result<String, ExportFailure> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), uris.to_vec()));
            if self.fail_names.iter().any(|n| n == name) {
                return Err(ExportFailure("Insufficient client scope".to_string()));
            }
            Ok(format!("https://open.spotify.com/playlist/{}", name.replace(' ', "_")))
        }
    }

    fn track(id: &str) -> Track {
        Track {
            id: TrackId::new(id),
            uri: format!("spotify:track:{}", id),
            ..Default::default()
        }
    }

    fn planned(label: &str, uris: &[&str]) -> PlannedExport {
        PlannedExport {
            tier_id: TierId::new(),
            label: label.to_string(),
            name: default_playlist_name(label),
            uris: uris.iter().map(|u| u.to_string()).collect(),
        }
    }

    #[test]
    fn test_plan_from_registry_skips_empty_tiers() {
        let mut registry = TierRegistry::with_default_tiers();
        let s = registry.tier_by_label("S").unwrap().id();
        let c = registry.tier_by_label("C").unwrap().id();
        registry.place_in_tier(track("T1"), s).unwrap();
        registry.place_in_tier(track("T2"), c).unwrap();
        registry.rename_tier(c, "c").unwrap();

        let plan = ExportPlan::from_registry(&registry).unwrap();

        let labels: Vec<&str> = plan.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["S", "C"]);
        assert_eq!(plan.entries()[1].name, "My C Tier Playlist");
        assert_eq!(plan.entries()[0].uris, vec!["spotify:track:T1".to_string()]);
    }

    #[test]
    fn test_plan_from_empty_registry() {
        let registry = TierRegistry::with_default_tiers();
        assert_eq!(ExportPlan::from_registry(&registry), Err(ExportError::NothingToExport));
        assert_eq!(ExportError::NothingToExport.to_string(), NOTHING_TO_EXPORT);
    }

    #[tokio::test]
    async fn test_blank_name_rejected_before_any_call() {
        let mut plan = ExportPlan::new(vec![planned("S", &["u1"]), planned("A", &["u2"])]);
        let a = plan.entries()[1].tier_id;
        assert!(plan.set_name(a, "   "));
        let exporter = RecordingExporter::default();

        let err = export_tiers(&plan, &exporter).await.unwrap_err();

        assert_eq!(err, ExportError::BlankName { tier: "A".to_string() });
        assert_eq!(err.to_string(), "Please enter a name for Tier A");
        assert!(exporter.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_plan_rejects_blank_tier_label() {
        let mut registry = TierRegistry::with_default_tiers();
        let s = registry.tier_by_label("S").unwrap().id();
        registry.rename_tier(s, "   ").unwrap();
        registry.place_in_tier(track("T1"), s).unwrap();

        assert_eq!(
            ExportPlan::from_registry(&registry),
            Err(ExportError::BlankLabel { tier_id: s })
        );
    }

    #[tokio::test]
    async fn test_blank_label_rejected_before_any_call() {
        let plan = ExportPlan::new(vec![planned("S", &["u1"]), planned("  ", &["u2"])]);
        let blank = plan.entries()[1].tier_id;
        let exporter = RecordingExporter::default();

        let err = export_tiers(&plan, &exporter).await.unwrap_err();

        assert_eq!(err, ExportError::BlankLabel { tier_id: blank });
        assert!(exporter.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_tier_makes_no_call_and_no_entry() {
        let plan = ExportPlan::new(vec![planned("S", &[]), planned("A", &["u1"])]);
        let exporter = RecordingExporter::default();

        let report = export_tiers(&plan, &exporter).await.unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].tier, "A");
        assert_eq!(exporter.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_middle_failure_does_not_block_others() {
        let plan = ExportPlan::new(vec![
            planned("S", &["u1"]),
            planned("A", &["u2", "u3"]),
            planned("B", &["u4"]),
        ]);
        let exporter = RecordingExporter {
            fail_names: vec!["My A Tier Playlist".to_string()],
            ..Default::default()
        };

        let report = export_tiers(&plan, &exporter).await.unwrap();

        assert_eq!(report.successes().count(), 2);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].tier, "A");
        assert_eq!(
            failures[0].outcome,
            ExportOutcome::Failed { error: "Insufficient client scope".to_string() }
        );

        // Awaited in tier order
        let names: Vec<String> = exporter.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, ["My S Tier Playlist", "My A Tier Playlist", "My B Tier Playlist"]);

        let summary = report.summary();
        assert!(summary.contains("Successfully saved:"));
        assert!(summary.contains("Failed to save:\n  Tier A: Insufficient client scope"));
    }

    #[tokio::test]
    async fn test_names_are_trimmed() {
        let mut plan = ExportPlan::new(vec![planned("S", &["u1"])]);
        let s = plan.entries()[0].tier_id;
        plan.set_name(s, "  Favourites  ");
        let exporter = RecordingExporter::default();

        let report = export_tiers(&plan, &exporter).await.unwrap();

        assert_eq!(report.results[0].playlist_name, "Favourites");
        assert!(!plan.clone().set_name(TierId::new(), "x"));
    }

    #[test]
    fn test_report_serializes_status_tag() {
        let result = TierExportResult {
            tier: "S".to_string(),
            playlist_name: "My S Tier Playlist".to_string(),
            outcome: ExportOutcome::Saved { url: "https://x".to_string() },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "saved");
        assert_eq!(json["url"], "https://x");
        assert_eq!(json["tier"], "S");
    }
}
