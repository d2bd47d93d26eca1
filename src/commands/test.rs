//! `test run` and `test clean`: DR scenarios for every configured test.

use std::time::Duration;

use anyhow::Result;
use tracing::info;

use super::{Command, GATHER_TIMEOUT};
use crate::backend::DrActions;
use crate::config::TestSpec;
use crate::context::Context;
use crate::error::Result as ActionResult;
use crate::namespaces;
use crate::report::{Status, Step};

pub const SETUP_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEPLOY_TIMEOUT: Duration = Duration::from_secs(300);
pub const DR_TIMEOUT: Duration = Duration::from_secs(600);
pub const UNDEPLOY_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Deploy,
    Protect,
    Failover,
    Relocate,
    Unprotect,
    Undeploy,
}

impl Action {
    fn name(self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Protect => "protect",
            Self::Failover => "failover",
            Self::Relocate => "relocate",
            Self::Unprotect => "unprotect",
            Self::Undeploy => "undeploy",
        }
    }

    fn timeout(self) -> Duration {
        match self {
            Self::Deploy => DEPLOY_TIMEOUT,
            Self::Undeploy => UNDEPLOY_TIMEOUT,
            Self::Protect | Self::Failover | Self::Relocate | Self::Unprotect => DR_TIMEOUT,
        }
    }

    fn run(self, actions: &dyn DrActions, ctx: &Context, test: &TestSpec) -> ActionResult<()> {
        match self {
            Self::Deploy => actions.deploy(ctx, test),
            Self::Protect => actions.protect(ctx, test),
            Self::Failover => actions.failover(ctx, test),
            Self::Relocate => actions.relocate(ctx, test),
            Self::Unprotect => actions.unprotect(ctx, test),
            Self::Undeploy => actions.undeploy(ctx, test),
        }
    }
}

const RUN_ACTIONS: &[Action] = &[
    Action::Deploy,
    Action::Protect,
    Action::Failover,
    Action::Relocate,
    Action::Unprotect,
    Action::Undeploy,
];

const CLEAN_ACTIONS: &[Action] = &[Action::Unprotect, Action::Undeploy];

pub fn run(cmd: &mut Command, actions: &dyn DrActions) -> Result<()> {
    if !cmd.validate_config() {
        return cmd.failed();
    }
    if !setup(cmd, actions) {
        return cmd.failed();
    }
    let failed_tests = run_tests(cmd, actions, RUN_ACTIONS);
    if !failed_tests.is_empty() {
        gather_failed(cmd, &failed_tests);
        return cmd.failed();
    }
    cmd.passed()
}

pub fn clean(cmd: &mut Command, actions: &dyn DrActions) -> Result<()> {
    if !cmd.validate_config() {
        return cmd.failed();
    }
    if !run_tests(cmd, actions, CLEAN_ACTIONS).is_empty() {
        return cmd.failed();
    }
    if !cleanup(cmd, actions) {
        return cmd.failed();
    }
    cmd.passed()
}

fn setup(cmd: &mut Command, actions: &dyn DrActions) -> bool {
    let timer = cmd.start_step("setup");
    let scope = cmd.context().with_timeout(SETUP_TIMEOUT);
    match actions.setup(&scope) {
        Ok(()) => cmd.pass_step(timer),
        Err(err) => cmd.fail_step(timer, &err),
    }
}

fn cleanup(cmd: &mut Command, actions: &dyn DrActions) -> bool {
    let timer = cmd.start_step("cleanup");
    let scope = cmd.context().with_timeout(SETUP_TIMEOUT);
    match actions.cleanup(&scope) {
        Ok(()) => cmd.pass_step(timer),
        Err(err) => cmd.fail_step(timer, &err),
    }
}

/// Runs every test in order and records one "tests" step. Returns the tests
/// that did not pass.
fn run_tests(
    cmd: &mut Command,
    actions: &dyn DrActions,
    sequence: &[Action],
) -> Vec<TestSpec> {
    let timer = cmd.start_step("tests");
    let tests = cmd.config().tests.clone();

    let mut items = Vec::with_capacity(tests.len());
    let mut failed = Vec::new();
    for test in tests {
        let step = run_test(cmd, actions, &test, sequence);
        let status = step.status.unwrap_or(Status::Failed);
        info!(test = %test.name(), %status, "test finished");
        cmd.report_mut().summary_mut().add(status);
        if status != Status::Passed {
            failed.push(test);
        }
        items.push(step);
    }

    cmd.finish_step(timer, items);
    failed
}

/// Runs the actions of one test, stopping at the first that does not pass.
fn run_test(
    cmd: &Command,
    actions: &dyn DrActions,
    test: &TestSpec,
    sequence: &[Action],
) -> Step {
    let timer = cmd.start_child(&test.name());
    let mut items = Vec::with_capacity(sequence.len());

    for action in sequence {
        let child = cmd.start_child(action.name());
        let scope = cmd.context().with_timeout(action.timeout());
        let step = match action.run(actions, &scope, test) {
            Ok(()) => cmd.pass_child(child),
            Err(err) => cmd.fail_child(child, &err),
        };
        let passed = step.is_passed();
        items.push(step);
        if !passed {
            break;
        }
    }

    cmd.finish_child(timer, items)
}

/// Gathers the namespaces of the failed tests for inspection.
fn gather_failed(cmd: &mut Command, failed_tests: &[TestSpec]) {
    let timer = cmd.start_step("gather data");
    let scope = cmd.context().with_timeout(GATHER_TIMEOUT);

    let gathered = namespaces::merge(
        namespaces::ramen_namespaces(&cmd.namespaces()),
        failed_tests.iter().map(TestSpec::namespace),
    );
    cmd.report_mut().namespaces = Some(gathered.clone());

    let clusters = cmd.env().clusters();
    let items = cmd.gather_clusters(&scope, &clusters, &gathered);
    cmd.finish_step(timer, items);
}
