//! Collaborators the commands drive. Every call takes the phase context and
//! reports cancellation as `Error::Canceled`.

use std::path::Path;
use std::sync::mpsc::Receiver;

use crate::config::TestSpec;
use crate::context::Context;
use crate::env::Cluster;
use crate::error::Result;
use crate::gather::GatherResult;

pub trait Backend: Send + Sync {
    /// Checks that every configured cluster is reachable and ready.
    fn validate(&self, ctx: &Context) -> Result<()>;

    /// Namespaces to gather for the application protected by the DRPC.
    fn application_namespaces(
        &self,
        ctx: &Context,
        drpc_name: &str,
        drpc_namespace: &str,
    ) -> Result<Vec<String>>;

    /// Gathers `namespaces` from every cluster into `output_dir/<cluster>`.
    fn gather(
        &self,
        ctx: &Context,
        clusters: &[Cluster],
        namespaces: &[String],
        output_dir: &Path,
    ) -> Receiver<GatherResult>;
}

/// DR actions run by `test run` and `test clean`.
pub trait DrActions: Send + Sync {
    fn setup(&self, ctx: &Context) -> Result<()>;
    fn deploy(&self, ctx: &Context, test: &TestSpec) -> Result<()>;
    fn protect(&self, ctx: &Context, test: &TestSpec) -> Result<()>;
    fn failover(&self, ctx: &Context, test: &TestSpec) -> Result<()>;
    fn relocate(&self, ctx: &Context, test: &TestSpec) -> Result<()>;
    fn unprotect(&self, ctx: &Context, test: &TestSpec) -> Result<()>;
    fn undeploy(&self, ctx: &Context, test: &TestSpec) -> Result<()>;
    fn cleanup(&self, ctx: &Context) -> Result<()>;
}
