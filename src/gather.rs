//! Parallel per-cluster data gathering.
//!
//! One thread runs per cluster and sends exactly one `GatherResult`. A
//! monitor thread joins every worker before dropping the last sender, so the
//! receiver ends only after all clusters finished, while the caller can
//! consume results as soon as each one arrives. A failing cluster never
//! affects the others and is never retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, warn};

use crate::context::Context;
use crate::env::Cluster;
use crate::error::Error;
use crate::util::seconds;

/// Outcome of gathering one cluster.
#[derive(Debug)]
pub struct GatherResult {
    pub name: String,
    pub error: Option<Error>,
    pub duration: f64,
}

/// Collects data from one cluster into `output_dir`.
pub trait ClusterGatherer: Send + Sync {
    fn gather_cluster(
        &self,
        ctx: &Context,
        cluster: &Cluster,
        namespaces: &[String],
        output_dir: &Path,
    ) -> Result<(), Error>;
}

/// Starts gathering every cluster into `output_dir/<cluster>` and returns
/// the results in completion order.
pub fn gather(
    ctx: &Context,
    gatherer: Arc<dyn ClusterGatherer>,
    clusters: &[Cluster],
    namespaces: &[String],
    output_dir: &Path,
) -> Receiver<GatherResult> {
    let (tx, rx) = mpsc::channel();
    let namespaces: Arc<[String]> = namespaces.into();

    let mut workers = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let task = Task {
            ctx: ctx.clone(),
            gatherer: Arc::clone(&gatherer),
            cluster: cluster.clone(),
            namespaces: Arc::clone(&namespaces),
            output_dir: output_dir.join(&cluster.name),
        };
        match spawn_worker(task, tx.clone()) {
            Ok(handle) => workers.push((cluster.name.clone(), handle)),
            Err(err) => {
                warn!(cluster = %cluster.name, error = %err, "failed to start gather task");
                let _ = tx.send(GatherResult {
                    name: cluster.name.clone(),
                    error: Some(Error::Io(err)),
                    duration: 0.0,
                });
            }
        }
    }

    thread::spawn(move || join_workers(workers, tx));
    rx
}

struct Task {
    ctx: Context,
    gatherer: Arc<dyn ClusterGatherer>,
    cluster: Cluster,
    namespaces: Arc<[String]>,
    output_dir: PathBuf,
}

impl Task {
    fn run(self) -> GatherResult {
        let started = Instant::now();
        debug!(cluster = %self.cluster.name, "gathering cluster");

        let error = self
            .ctx
            .check()
            .and_then(|_| {
                self.gatherer.gather_cluster(
                    &self.ctx,
                    &self.cluster,
                    &self.namespaces,
                    &self.output_dir,
                )
            })
            .err();

        GatherResult {
            name: self.cluster.name,
            error,
            duration: seconds(started.elapsed()),
        }
    }
}

fn spawn_worker(task: Task, tx: Sender<GatherResult>) -> std::io::Result<JoinHandle<bool>> {
    thread::Builder::new()
        .name(format!("gather-{}", task.cluster.name))
        .spawn(move || tx.send(task.run()).is_ok())
}

/// Waits for every worker. A worker that panicked never sent its result, so
/// one is sent on its behalf before the channel closes.
fn join_workers(workers: Vec<(String, JoinHandle<bool>)>, tx: Sender<GatherResult>) {
    for (name, handle) in workers {
        if handle.join().is_err() {
            warn!(cluster = %name, "gather task panicked");
            let _ = tx.send(GatherResult {
                name,
                error: Some(anyhow::anyhow!("gather task panicked").into()),
                duration: 0.0,
            });
        }
    }
}
