//! Command orchestration.
//!
//! A command runs its phases one after another. Every phase records exactly
//! one top-level step and returns whether the report is still passing; the
//! first phase that does not pass stops the command. The report is written
//! to the output directory on every exit path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tracing::{error, info, warn};

use crate::backend::Backend;
use crate::config::{Config, Namespaces};
use crate::console;
use crate::context::Context;
use crate::env::{Cluster, Env};
use crate::error::Error;
use crate::namespaces;
use crate::report::{Application, Report, Status, Step, StepTimer};

pub mod gather;
pub mod test;
pub mod validate;


pub const VALIDATE_CONFIG_TIMEOUT: Duration = Duration::from_secs(30);
pub const INSPECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const GATHER_TIMEOUT: Duration = Duration::from_secs(600);

/// A command that ran and reported a non-passing status. Its console line
/// has already been printed.
#[derive(Debug, thiserror::Error)]
#[error("{command} {status}")]
pub struct CommandFailed {
    pub command: String,
    pub status: Status,
}

pub struct Command {
    name: String,
    config: Config,
    env: Env,
    backend: Arc<dyn Backend>,
    output_dir: PathBuf,
    ctx: Context,
    report: Report,
}

impl Command {
    pub fn new(
        name: &str,
        config: Config,
        backend: Arc<dyn Backend>,
        output_dir: PathBuf,
        ctx: Context,
    ) -> Self {
        let env = Env::from_config(&config);
        let report = Report::new(name, config.clone());
        Self {
            name: name.to_string(),
            config,
            env,
            backend,
            output_dir,
            ctx,
            report,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn namespaces(&self) -> Namespaces {
        self.config.namespaces()
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Root of the gathered resources, one directory per cluster.
    pub fn data_dir(&self) -> PathBuf {
        self.output_dir.join("data")
    }

    #[cfg(test)]
    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn report_mut(&mut self) -> &mut Report {
        &mut self.report
    }

    pub fn set_application(&mut self, name: &str, namespace: &str) {
        self.report.application = Some(Application {
            name: name.to_string(),
            namespace: namespace.to_string(),
        });
    }

    pub fn start_step(&self, name: &str) -> StepTimer {
        info!("Step {name:?} started");
        console::step(name);
        StepTimer::start(name)
    }

    pub fn start_child(&self, name: &str) -> StepTimer {
        info!("Step {name:?} started");
        StepTimer::start(name)
    }

    pub fn pass_step(&mut self, timer: StepTimer) -> bool {
        let step = timer.pass();
        log_step(&step, None);
        self.report.add_step(step)
    }

    pub fn fail_step(&mut self, timer: StepTimer, err: &Error) -> bool {
        let step = timer.fail(err);
        log_step(&step, Some(err));
        self.report.add_step(step)
    }

    /// Closes a step whose status is derived from `items`.
    pub fn finish_step(&mut self, timer: StepTimer, items: Vec<Step>) -> bool {
        let step = timer.finish(items);
        log_finished(&step);
        self.report.add_step(step)
    }

    pub fn pass_child(&self, timer: StepTimer) -> Step {
        let step = timer.pass();
        log_step(&step, None);
        step
    }

    pub fn fail_child(&self, timer: StepTimer, err: &Error) -> Step {
        let step = timer.fail(err);
        log_step(&step, Some(err));
        step
    }

    pub fn finish_child(&self, timer: StepTimer, items: Vec<Step>) -> Step {
        let step = timer.finish(items);
        log_finished(&step);
        step
    }

    pub fn validate_config(&mut self) -> bool {
        let timer = self.start_step("validate config");
        let scope = self.ctx.with_timeout(VALIDATE_CONFIG_TIMEOUT);
        match self.backend.validate(&scope) {
            Ok(()) => self.pass_step(timer),
            Err(err) => self.fail_step(timer, &err),
        }
    }

    /// Resolves the namespaces of the application and records them in the
    /// report together with the Ramen namespaces.
    pub fn inspect_application(
        &mut self,
        ctx: &Context,
        drpc_name: &str,
        drpc_namespace: &str,
    ) -> (Step, Option<Vec<String>>) {
        let timer = self.start_child("inspect application");
        let scope = ctx.with_timeout(INSPECT_TIMEOUT);
        match self
            .backend
            .application_namespaces(&scope, drpc_name, drpc_namespace)
        {
            Ok(app_namespaces) => {
                let resolved =
                    namespaces::merge(namespaces::ramen_namespaces(&self.namespaces()), app_namespaces);
                info!(namespaces = ?resolved, "resolved application namespaces");
                self.report.namespaces = Some(resolved.clone());
                (self.pass_child(timer), Some(resolved))
            }
            Err(err) => (self.fail_child(timer, &err), None),
        }
    }

    /// Gathers `namespaces` from `clusters` in parallel. Results are consumed
    /// as they arrive and returned as one step per cluster, in `clusters`
    /// order.
    pub fn gather_clusters(
        &self,
        ctx: &Context,
        clusters: &[Cluster],
        namespaces: &[String],
    ) -> Vec<Step> {
        let data_dir = self.data_dir();
        info!(
            clusters = clusters.len(),
            namespaces = ?namespaces,
            output = %data_dir.display(),
            "gathering data"
        );

        let mut results = HashMap::new();
        for result in self.backend.gather(ctx, clusters, namespaces, &data_dir) {
            match &result.error {
                None => info!(cluster = %result.name, duration = result.duration, "gathered data"),
                Some(err) => error!(cluster = %result.name, error = %err, "failed to gather data"),
            }
            results.insert(result.name.clone(), result);
        }

        clusters
            .iter()
            .map(|cluster| {
                let name = format!("gather \"{}\"", cluster.name);
                match results.remove(&cluster.name) {
                    Some(result) => {
                        let step = Step {
                            name,
                            status: Some(match &result.error {
                                None => Status::Passed,
                                Some(err) => Status::from_error(err),
                            }),
                            duration: result.duration,
                            items: Vec::new(),
                        };
                        log_step(&step, result.error.as_ref());
                        step
                    }
                    None => {
                        let err = Error::Other(anyhow::anyhow!("no gather result"));
                        let step = Step {
                            name,
                            status: Some(Status::Failed),
                            duration: 0.0,
                            items: Vec::new(),
                        };
                        log_step(&step, Some(&err));
                        step
                    }
                }
            })
            .collect()
    }

    /// Writes the report and returns a [`CommandFailed`] error naming its
    /// status.
    pub fn failed(&self) -> Result<()> {
        self.write_report()?;
        let status = self.report.status.unwrap_or(Status::Failed);
        console::error(&format!("{} {status}", self.name));
        Err(CommandFailed {
            command: self.name.clone(),
            status,
        }
        .into())
    }

    pub fn passed(&self) -> Result<()> {
        self.write_report()?;
        console::completed(&format!("{} passed", self.name));
        Ok(())
    }

    fn write_report(&self) -> Result<()> {
        let paths = self
            .report
            .write(&self.output_dir)
            .with_context(|| format!("failed to write {} report", self.name))?;
        for path in &paths {
            info!(path = %path.display(), "report written");
        }
        if let Some(path) = paths.first() {
            console::info(&format!("Report saved to {}", path.display()));
        }
        Ok(())
    }
}

/// Logs a closed leaf step and prints its console line.
fn log_step(step: &Step, err: Option<&Error>) {
    let name = step.name.as_str();
    match (step.status, err) {
        (Some(Status::Canceled), Some(err)) => warn!(error = %err, "Step {name:?} canceled"),
        (Some(Status::Canceled), None) => warn!("Step {name:?} canceled"),
        (Some(Status::Failed), Some(err)) => error!(error = %err, "Step {name:?} failed"),
        (Some(Status::Failed), None) => error!("Step {name:?} failed"),
        _ => info!(duration = step.duration, "Step {name:?} passed"),
    }
    console_line(step);
}

fn log_finished(step: &Step) {
    info!(status = ?step.status, duration = step.duration, "Step {:?} finished", step.name);
    console_line(step);
}

fn console_line(step: &Step) {
    let name = step.name.as_str();
    match step.status {
        Some(Status::Failed) => console::error(&format!("{name} failed")),
        Some(Status::Canceled) => console::canceled(&format!("{name} canceled")),
        _ => console::pass(&format!("{name} passed")),
    }
}
