use anyhow::Result;
use tracing::{error, info};

use super::{Command, GATHER_TIMEOUT};
use crate::console;
use crate::error::Error;
use crate::namespaces;
use crate::report::{Status, Step, StepTimer, Summary};
use crate::validation::{self, has_issues};

/// `validate clusters`: gathers the Ramen namespaces and validates the DR
/// resources of the hub and managed clusters.
pub fn clusters(cmd: &mut Command) -> Result<()> {
    if !cmd.validate_config() {
        return cmd.failed();
    }
    if !validate_clusters(cmd) {
        return cmd.failed();
    }
    cmd.passed()
}

/// `validate application`: gathers the application namespaces and validates
/// the application DR state.
pub fn application(cmd: &mut Command, drpc_name: &str, drpc_namespace: &str) -> Result<()> {
    cmd.set_application(drpc_name, drpc_namespace);

    if !cmd.validate_config() {
        return cmd.failed();
    }
    if !validate_application(cmd, drpc_name, drpc_namespace) {
        return cmd.failed();
    }
    cmd.passed()
}

fn validate_clusters(cmd: &mut Command) -> bool {
    let timer = cmd.start_step("validate clusters");
    let scope = cmd.context().with_timeout(GATHER_TIMEOUT);

    let ramen_namespaces = namespaces::ramen_namespaces(&cmd.namespaces());
    cmd.report_mut().namespaces = Some(ramen_namespaces.clone());

    let clusters = cmd.env().clusters();
    let mut items = cmd.gather_clusters(&scope, &clusters, &ramen_namespaces);
    if items.iter().all(Step::is_passed) {
        items.push(validate_gathered_clusters(cmd));
    }

    cmd.finish_step(timer, items)
}

fn validate_application(cmd: &mut Command, drpc_name: &str, drpc_namespace: &str) -> bool {
    let timer = cmd.start_step("validate application");
    let scope = cmd.context().with_timeout(GATHER_TIMEOUT);

    let (inspect, namespaces) = cmd.inspect_application(&scope, drpc_name, drpc_namespace);
    let mut items = vec![inspect];
    if let Some(namespaces) = namespaces {
        let clusters = cmd.env().clusters();
        let gathered = cmd.gather_clusters(&scope, &clusters, &namespaces);
        let complete = gathered.iter().all(Step::is_passed);
        items.extend(gathered);
        if complete {
            items.push(validate_gathered_application(cmd, drpc_name, drpc_namespace));
        }
    }

    cmd.finish_step(timer, items)
}

fn validate_gathered_clusters(cmd: &mut Command) -> Step {
    let timer = cmd.start_child("validate data");
    let mut summary = Summary::default();
    let result = validation::validate_clusters(
        &cmd.data_dir(),
        cmd.env(),
        &cmd.namespaces(),
        &mut summary,
    );

    match result {
        Ok(status) => {
            let report = cmd.report_mut();
            report.clusters_status = Some(status);
            report.summary = Some(summary.clone());
            classified(cmd, timer, &summary)
        }
        Err(err) => cmd.fail_child(timer, &err),
    }
}

fn validate_gathered_application(cmd: &mut Command, drpc_name: &str, drpc_namespace: &str) -> Step {
    let timer = cmd.start_child("validate data");
    let mut summary = Summary::default();
    let result = validation::validate_application(
        &cmd.data_dir(),
        cmd.env(),
        drpc_name,
        drpc_namespace,
        &mut summary,
    );

    match result {
        Ok(status) => {
            let report = cmd.report_mut();
            report.application_status = Some(status);
            report.summary = Some(summary.clone());
            classified(cmd, timer, &summary)
        }
        Err(err) => cmd.fail_child(timer, &err),
    }
}

/// Closes the validation step from the classification summary.
fn classified(cmd: &Command, timer: StepTimer, summary: &Summary) -> Step {
    let counts = summary
        .iter()
        .map(|(key, count)| format!("{key}={count}"))
        .collect::<Vec<_>>()
        .join(" ");
    if has_issues(summary) {
        error!(summary = %counts, "validation found issues");
        console::warn(&format!("Issues found: {counts}"));
        let step = timer.with_status(Status::Failed);
        let err = Error::Other(anyhow::anyhow!("validation found stale or problem states"));
        super::log_step(&step, Some(&err));
        step
    } else {
        info!(summary = %counts, "validation passed");
        cmd.pass_child(timer)
    }
}
