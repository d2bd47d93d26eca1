//! Hierarchical execution report.
//!
//! A parent's status is derived from its children with the precedence
//! Failed > Canceled > Passed. The same rule folds top-level steps into the
//! report status, so a report marked Failed is never downgraded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::util::{now_utc_string, seconds, write_text, write_yaml};
use crate::validation::{ApplicationStatus, ClustersStatus};

mod html;
#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Canceled,
    Skipped,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
        }
    }

    /// Canceled when the error carries a cancellation, Failed otherwise.
    pub fn from_error(err: &Error) -> Self {
        if err.is_canceled() {
            Self::Canceled
        } else {
            Self::Failed
        }
    }

    fn rank(status: Option<Self>) -> u8 {
        match status {
            Some(Self::Failed) => 2,
            Some(Self::Canceled) => 1,
            _ => 0,
        }
    }

    /// Folds child statuses into the parent status.
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Option<Self>>,
    {
        match statuses.into_iter().map(Self::rank).max().unwrap_or(0) {
            2 => Self::Failed,
            1 => Self::Canceled,
            _ => Self::Passed,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SummaryKey for Status {
    fn summary_key(&self) -> &'static str {
        self.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Step>,
}

impl Step {
    pub fn is_passed(&self) -> bool {
        self.status == Some(Status::Passed)
    }
}

/// A step that has started but not finished. Closing it consumes the timer,
/// so a step is produced exactly once.
#[derive(Debug)]
pub struct StepTimer {
    name: String,
    started: Instant,
}

impl StepTimer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Instant::now(),
        }
    }

    pub fn pass(self) -> Step {
        self.close(Some(Status::Passed), Vec::new())
    }

    pub fn fail(self, err: &Error) -> Step {
        self.close(Some(Status::from_error(err)), Vec::new())
    }

    pub fn with_status(self, status: Status) -> Step {
        self.close(Some(status), Vec::new())
    }

    /// Closes a step that delegated its work to `items`.
    pub fn finish(self, items: Vec<Step>) -> Step {
        let status = Status::aggregate(items.iter().map(|item| item.status));
        self.close(Some(status), items)
    }

    fn close(self, status: Option<Status>, items: Vec<Step>) -> Step {
        Step {
            name: self.name,
            status,
            duration: seconds(self.started.elapsed()),
            items,
        }
    }
}

/// Keys a summary can count.
pub trait SummaryKey {
    fn summary_key(&self) -> &'static str;
}

/// Counters keyed by validation state or test outcome. Never decremented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summary(BTreeMap<String, u64>);

impl Summary {
    pub fn add(&mut self, key: impl SummaryKey) {
        *self.0.entry(key.summary_key().to_string()).or_default() += 1;
    }

    pub fn count(&self, key: impl SummaryKey) -> u64 {
        self.0.get(key.summary_key()).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(key, count)| (key.as_str(), *count))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub os: String,
    pub arch: String,
    pub cpus: usize,
}

impl Host {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpus: std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub version: String,
}

impl Build {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// The DRPC under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub name: String,
    pub created: String,
    pub host: Host,
    pub build: Build,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
    pub config: Config,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_status: Option<ApplicationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clusters_status: Option<ClustersStatus>,
}

impl Report {
    pub fn new(name: impl Into<String>, config: Config) -> Self {
        Self {
            name: name.into(),
            created: now_utc_string(),
            host: Host::current(),
            build: Build::current(),
            status: None,
            duration: 0.0,
            steps: Vec::new(),
            config,
            application: None,
            namespaces: None,
            summary: None,
            application_status: None,
            clusters_status: None,
        }
    }

    /// Appends a finished top-level step and returns whether the report is
    /// still passing.
    pub fn add_step(&mut self, step: Step) -> bool {
        self.duration += step.duration;
        let status = Status::aggregate([self.status, step.status]);
        self.status = Some(status);
        self.steps.push(step);
        self.is_passed()
    }

    pub fn is_passed(&self) -> bool {
        self.status == Some(Status::Passed)
    }

    pub fn summary_mut(&mut self) -> &mut Summary {
        self.summary.get_or_insert_with(Summary::default)
    }

    /// Writes `<dir>/<name>.yaml` and `<dir>/<name>.html`.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let yaml_path = dir.join(format!("{}.yaml", self.name));
        write_yaml(&yaml_path, self)?;
        let html_path = dir.join(format!("{}.html", self.name));
        write_text(&html_path, &html::render(self))?;
        Ok(vec![yaml_path, html_path])
    }
}
