use anyhow::Context;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const SCAN_FORMAT: &str = "rhino-cloud-simple";
pub const SCAN_FORMAT_VERSION: f64 = 2.0;
pub const PLATFORM: &str = "Any";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub resource_type: String,
    pub global_identifier: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub meta_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub meta: String,
}

impl Finding {
    pub fn new(resource_type: impl Into<String>, global_identifier: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            global_identifier: global_identifier.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "scan-date")]
    pub scan_date: i64,
    #[serde(rename = "scan-uuid")]
    pub scan_uuid: String,
    #[serde(rename = "scan-format")]
    pub scan_format: String,
    #[serde(rename = "scan-format-version", serialize_with = "version_number")]
    pub scan_format_version: f64,
    pub platform: String,
    /// `None` serializes as `null`; a fresh report starts with an empty map.
    pub vulnerabilities: Option<BTreeMap<String, Vec<Finding>>>,
}

impl Report {
    pub fn new(scan_date: i64, scan_uuid: impl Into<String>) -> Self {
        Self {
            scan_date,
            scan_uuid: scan_uuid.into(),
            scan_format: SCAN_FORMAT.to_string(),
            scan_format_version: SCAN_FORMAT_VERSION,
            platform: PLATFORM.to_string(),
            vulnerabilities: Some(BTreeMap::new()),
        }
    }
}

/// Whole versions serialize as integers: `2`, not `2.0`.
fn version_number<S: serde::Serializer>(version: &f64, s: S) -> Result<S::Ok, S::Error> {
    if version.fract() == 0.0 && version.abs() < i64::MAX as f64 {
        s.serialize_i64(*version as i64)
    } else {
        s.serialize_f64(*version)
    }
}

/// Collects findings from all workers. Shared behind an `Arc`.
pub struct Reporter {
    report: Mutex<Report>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::from_report(Report::new(chrono::Utc::now().timestamp(), uuid::Uuid::new_v4().to_string()))
    }

    pub fn from_report(report: Report) -> Self {
        Self { report: Mutex::new(report) }
    }

    pub fn add(&self, category: &str, finding: Finding) {
        let mut report = self.report.lock();
        report
            .vulnerabilities
            .get_or_insert_with(BTreeMap::new)
            .entry(category.to_string())
            .or_default()
            .push(finding);
    }

    pub fn finding_count(&self) -> usize {
        self.report
            .lock()
            .vulnerabilities
            .as_ref()
            .map(|v| v.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> Report {
        self.report.lock().clone()
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(&*self.report.lock()).context("converting report to json")
    }

    /// Write the report to `path`, readable by owner and group only.
    pub async fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        let json = self.to_json()?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing report to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o640))
                .await
                .with_context(|| format!("setting permissions on {}", path.display()))?;
        }

        tracing::info!(path = %path.display(), findings = self.finding_count(), "report written");
        Ok(())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}
