//! `kubectl` backed collaborators.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::context::Context;
use crate::env::Cluster;
use crate::error::{Error, Result};

mod actions;
mod backend;
mod gather;

pub use actions::KubectlActions;
pub use backend::KubectlBackend;
pub use gather::KubectlGatherer;

const PROGRAM: &str = "kubectl";

/// Runs `kubectl` against one cluster.
#[derive(Debug, Clone)]
pub struct Kubectl {
    program: String,
    kubeconfig: PathBuf,
}

impl Kubectl {
    pub fn new(cluster: &Cluster) -> Self {
        Self {
            program: PROGRAM.to_string(),
            kubeconfig: cluster.kubeconfig.clone(),
        }
    }

    pub fn run(&self, ctx: &Context, args: &[&str]) -> Result<Vec<u8>> {
        self.run_with_input(ctx, args, None)
    }

    pub fn get_json<T: DeserializeOwned>(&self, ctx: &Context, args: &[&str]) -> Result<T> {
        let mut full = args.to_vec();
        full.extend(["--output", "json"]);
        let stdout = self.run(ctx, &full)?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    /// Applies a manifest passed on stdin.
    pub fn apply(&self, ctx: &Context, manifest: &str) -> Result<()> {
        self.run_with_input(ctx, &["apply", "--filename", "-"], Some(manifest))?;
        Ok(())
    }

    fn run_with_input(&self, ctx: &Context, args: &[&str], input: Option<&str>) -> Result<Vec<u8>> {
        ctx.check()?;

        let mut command = Command::new(&self.program);
        command
            .arg("--kubeconfig")
            .arg(&self.kubeconfig)
            .arg(format!("--request-timeout={}", request_timeout(ctx)))
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(program = %self.program, args = %args.join(" "), "running command");
        let mut child = command.spawn()?;
        if let Some(input) = input {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes())?;
            }
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            // A request cut short by the deadline is a cancellation, not a failure.
            ctx.check()?;
            return Err(Error::Command {
                program: self.program.clone(),
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// `--request-timeout` value for the context, `0` meaning no limit.
fn request_timeout(ctx: &Context) -> String {
    match ctx.remaining() {
        Some(remaining) => format!("{}s", remaining.as_secs().max(1)),
        None => "0".to_string(),
    }
}

/// `kubectl` resource name for a gathered resource directory: `apps/deployments`
/// becomes `deployments.apps`.
pub fn resource_name(resource: &str) -> String {
    match resource.split_once('/') {
        Some((group, plural)) => format!("{plural}.{group}"),
        None => resource.to_string(),
    }
}

pub fn is_not_found(err: &Error) -> bool {
    matches!(err, Error::Command { stderr, .. } if stderr.contains("NotFound") || stderr.contains("not found"))
}

/// The cluster does not serve the resource type, e.g. Ramen CRDs on a
/// cluster without Ramen.
pub fn is_missing_type(err: &Error) -> bool {
    matches!(err, Error::Command { stderr, .. } if stderr.contains("the server doesn't have a resource type"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::CancelReason;

    fn kubectl(program: &str) -> Kubectl {
        Kubectl {
            program: program.to_string(),
            kubeconfig: PathBuf::from("/tmp/hub.kubeconfig"),
        }
    }

    #[test]
    fn request_timeout_follows_context_deadline() {
        let ctx = Context::background();
        assert_eq!(request_timeout(&ctx), "0");

        let scope = ctx.with_timeout(Duration::from_secs(30));
        let timeout = request_timeout(&scope);
        assert!(timeout == "30s" || timeout == "29s", "got {timeout}");

        let expired = ctx.with_timeout(Duration::ZERO);
        assert_eq!(request_timeout(&expired), "1s");
    }

    #[test]
    fn resource_name_puts_group_last() {
        assert_eq!(resource_name("apps/deployments"), "deployments.apps");
        assert_eq!(
            resource_name("ramendr.openshift.io/drplacementcontrols"),
            "drplacementcontrols.ramendr.openshift.io"
        );
        assert_eq!(resource_name("persistentvolumeclaims"), "persistentvolumeclaims");
    }

    #[test]
    fn successful_command_returns_stdout() {
        let stdout = kubectl("true").run(&Context::background(), &["get", "pods"]).expect("run");
        assert!(stdout.is_empty());
    }

    #[test]
    fn failing_command_maps_to_command_error() {
        let err = kubectl("false")
            .run(&Context::background(), &["get", "pods"])
            .expect_err("false exits non-zero");
        match err {
            Error::Command { program, args, .. } => {
                assert_eq!(program, "false");
                assert_eq!(args, "get pods");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn canceled_context_never_starts_the_command() {
        let ctx = Context::background();
        ctx.cancel();
        let err = kubectl("/nonexistent/kubectl")
            .run(&ctx, &["get", "pods"])
            .expect_err("canceled");
        assert!(matches!(err, Error::Canceled(CancelReason::Canceled)));
    }

    #[test]
    fn classifies_command_errors() {
        let missing = Error::Command {
            program: PROGRAM.to_string(),
            args: "get drclusters.ramendr.openshift.io".to_string(),
            stderr: "error: the server doesn't have a resource type \"drclusters\"".to_string(),
        };
        assert!(is_missing_type(&missing));
        assert!(!is_not_found(&missing));

        let not_found = Error::Command {
            program: PROGRAM.to_string(),
            args: "get drpc app".to_string(),
            stderr: "Error from server (NotFound): drplacementcontrols \"app\" not found".to_string(),
        };
        assert!(is_not_found(&not_found));
        assert!(!is_missing_type(&not_found));
    }
}
