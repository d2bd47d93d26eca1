use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{Kubectl, is_missing_type, resource_name};
use crate::context::Context;
use crate::env::Cluster;
use crate::error::Result;
use crate::gather::ClusterGatherer;
use crate::output::OutputReader;
use crate::resources::{
    DEPLOYMENT_RESOURCE, DRCLUSTER_RESOURCE, DRPC_RESOURCE, DRPOLICY_RESOURCE, PVC_RESOURCE,
    VRG_RESOURCE,
};
use crate::util::write_yaml;

const CLUSTER_RESOURCES: &[&str] = &[
    DRCLUSTER_RESOURCE,
    DRPOLICY_RESOURCE,
    "ramendr.openshift.io/drclusterconfigs",
    "persistentvolumes",
    "storage.k8s.io/storageclasses",
];

const NAMESPACED_RESOURCES: &[&str] = &[
    DRPC_RESOURCE,
    VRG_RESOURCE,
    "cluster.open-cluster-management.io/placements",
    PVC_RESOURCE,
    DEPLOYMENT_RESOURCE,
    "apps/statefulsets",
    "pods",
    "configmaps",
    "events",
];

#[derive(Debug, Deserialize)]
struct ObjectList {
    #[serde(default)]
    items: Vec<Value>,
}

/// Walks a live cluster and writes every object of the gathered resource
/// types as YAML.
#[derive(Debug, Default)]
pub struct KubectlGatherer;

impl ClusterGatherer for KubectlGatherer {
    fn gather_cluster(
        &self,
        ctx: &Context,
        cluster: &Cluster,
        namespaces: &[String],
        output_dir: &Path,
    ) -> Result<()> {
        let kubectl = Kubectl::new(cluster);
        let output = OutputReader::new(output_dir);
        let mut count = 0;

        for resource in CLUSTER_RESOURCES {
            count += gather_resources(ctx, &kubectl, &output, "", resource)?;
        }
        for namespace in namespaces {
            for resource in NAMESPACED_RESOURCES {
                count += gather_resources(ctx, &kubectl, &output, namespace, resource)?;
            }
        }

        info!(cluster = %cluster.name, objects = count, "gathered cluster");
        Ok(())
    }
}

fn gather_resources(
    ctx: &Context,
    kubectl: &Kubectl,
    output: &OutputReader,
    namespace: &str,
    resource: &str,
) -> Result<usize> {
    let name = resource_name(resource);
    let mut args = vec!["get", name.as_str()];
    if !namespace.is_empty() {
        args.extend(["--namespace", namespace]);
    }

    let list: ObjectList = match kubectl.get_json(ctx, &args) {
        Ok(list) => list,
        Err(err) if is_missing_type(&err) => {
            debug!(resource, "resource type not served, skipping");
            return Ok(0);
        }
        Err(err) => return Err(err),
    };

    let mut written = 0;
    for item in &list.items {
        let Some(object_name) = item.pointer("/metadata/name").and_then(Value::as_str) else {
            continue;
        };
        write_yaml(&output.resource_path(namespace, resource, object_name), item)?;
        written += 1;
    }
    Ok(written)
}
