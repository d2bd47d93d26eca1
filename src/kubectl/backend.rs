use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use tracing::{info, warn};

use super::{Kubectl, KubectlGatherer, is_not_found, resource_name};
use crate::backend::Backend;
use crate::config::Namespaces;
use crate::context::Context;
use crate::env::{Cluster, Env};
use crate::error::{Error, Result};
use crate::gather::{self, GatherResult};
use crate::namespaces;
use crate::resources::{DRPC_RESOURCE, DrPlacementControl};

pub struct KubectlBackend {
    env: Env,
    namespaces: Namespaces,
    gatherer: Arc<KubectlGatherer>,
}

impl KubectlBackend {
    pub fn new(env: Env, namespaces: Namespaces) -> Self {
        Self {
            env,
            namespaces,
            gatherer: Arc::new(KubectlGatherer),
        }
    }

    fn check_namespace(&self, ctx: &Context, cluster: &Cluster, namespace: &str) -> Result<()> {
        Kubectl::new(cluster)
            .run(ctx, &["get", "namespace", namespace, "--output", "name"])
            .map_err(|err| {
                warn!(cluster = %cluster.name, namespace, error = %err, "cluster is not ready");
                if is_not_found(&err) {
                    Error::not_found("namespace", format!("{}/{namespace}", cluster.name))
                } else {
                    err
                }
            })?;
        info!(cluster = %cluster.name, namespace, "cluster is ready");
        Ok(())
    }
}

impl Backend for KubectlBackend {
    fn validate(&self, ctx: &Context) -> Result<()> {
        self.check_namespace(ctx, &self.env.hub, &self.namespaces.ramen_hub_namespace)?;
        if let Some(passive_hub) = &self.env.passive_hub {
            self.check_namespace(ctx, passive_hub, &self.namespaces.ramen_hub_namespace)?;
        }
        for cluster in self.env.managed_clusters() {
            self.check_namespace(ctx, cluster, &self.namespaces.ramen_dr_cluster_namespace)?;
        }
        Ok(())
    }

    fn application_namespaces(
        &self,
        ctx: &Context,
        drpc_name: &str,
        drpc_namespace: &str,
    ) -> Result<Vec<String>> {
        let resource = resource_name(DRPC_RESOURCE);
        let drpc: DrPlacementControl = Kubectl::new(&self.env.hub)
            .get_json(
                ctx,
                &["get", resource.as_str(), drpc_name, "--namespace", drpc_namespace],
            )
            .map_err(|err| {
                if is_not_found(&err) {
                    Error::not_found("drpc", format!("{drpc_namespace}/{drpc_name}"))
                } else {
                    err
                }
            })?;
        Ok(namespaces::application_namespaces(&drpc, &self.namespaces))
    }

    fn gather(
        &self,
        ctx: &Context,
        clusters: &[Cluster],
        namespaces: &[String],
        output_dir: &Path,
    ) -> Receiver<GatherResult> {
        gather::gather(ctx, self.gatherer.clone(), clusters, namespaces, output_dir)
    }
}
