//! Evaluation report
//!
//! Serializable record of one evaluation run: run id, configuration
//! fingerprint, summary statistics, per-episode detail and (for shielded
//! runs) the shield statistics. Rendering only; writing files is left to the
//! caller.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{MetricsAggregator, MetricsSummary};
use crate::config::{ConfigError, EvaluationConfig};
use crate::models::EpisodeOutcome;
use crate::shield::ShieldStatistics;

/// Report rendering errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no shield statistics recorded for run '{0}'")]
    NoShield(String),
}

/// Column order of [`EvaluationReport::episodes_csv`]
pub const EPISODE_CSV_HEADER: &str = "episode,seed,total_reward,episode_length,collision_occurred,overtaking_complete,total_violations,avg_speed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    /// Policy name as reported by the decision source
    pub policy: String,
    /// Free-form run label, e.g. `baseline_medium_seed42`
    pub label: String,
    pub config_fingerprint: String,
    pub summary: MetricsSummary,
    pub episodes: Vec<EpisodeOutcome>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shield: Option<ShieldStatistics>,
}

/// Summary document without per-episode rows
#[derive(Serialize)]
struct SummaryDocument<'a> {
    run_id: &'a Uuid,
    policy: &'a str,
    label: &'a str,
    config_fingerprint: &'a str,
    #[serde(flatten)]
    summary: &'a MetricsSummary,
}

impl EvaluationReport {
    /// Build a report for a finished run under a fresh run id
    pub fn new(
        policy: impl Into<String>,
        label: impl Into<String>,
        config: &EvaluationConfig,
        metrics: &MetricsAggregator,
        shield: Option<ShieldStatistics>,
    ) -> Result<Self, ReportError> {
        Ok(Self {
            run_id: Uuid::new_v4(),
            policy: policy.into(),
            label: label.into(),
            config_fingerprint: config.fingerprint()?,
            summary: metrics.compute_summary(),
            episodes: metrics.episodes().to_vec(),
            shield,
        })
    }

    /// Full report as pretty JSON
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Summary statistics plus run metadata as pretty JSON
    pub fn summary_json(&self) -> Result<String, ReportError> {
        let doc = SummaryDocument {
            run_id: &self.run_id,
            policy: &self.policy,
            label: &self.label,
            config_fingerprint: &self.config_fingerprint,
            summary: &self.summary,
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Shield statistics as pretty JSON
    pub fn shield_json(&self) -> Result<String, ReportError> {
        let stats = self
            .shield
            .as_ref()
            .ok_or_else(|| ReportError::NoShield(self.label.clone()))?;
        Ok(serde_json::to_string_pretty(stats)?)
    }

    /// One CSV row per episode, header first
    pub fn episodes_csv(&self) -> String {
        let mut out = String::with_capacity(64 * (self.episodes.len() + 1));
        out.push_str(EPISODE_CSV_HEADER);
        out.push('\n');
        for e in &self.episodes {
            let seed = e.seed.map(|s| s.to_string()).unwrap_or_default();
            // Writing to a String cannot fail
            let _ = writeln!(
                out,
                "{},{},{:.6},{},{},{},{},{:.6}",
                e.episode,
                seed,
                e.total_reward,
                e.episode_length,
                e.collision_occurred,
                e.overtaking_complete,
                e.total_violations,
                e.avg_speed,
            );
        }
        out
    }
}
