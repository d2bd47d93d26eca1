//! DR actions for discovered applications.
//!
//! The workload is applied directly on the managed clusters from a generated
//! kustomization. Protection is a Placement plus a DRPC in the Ramen ops
//! namespace on the hub; failover and relocate patch the DRPC and poll it
//! until the action completes or the context expires.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{Kubectl, request_timeout, resource_name};
use crate::backend::DrActions;
use crate::config::{Config, Namespaces, PvcSpec, Repo, TestSpec};
use crate::context::Context;
use crate::env::{Cluster, Env};
use crate::error::{Error, Result};
use crate::resources::{
    ACTION_FAILOVER, ACTION_RELOCATE, DRPC_RESOURCE, DrPlacementControl, DrpcSpec, ObjectRef,
    PROGRESSION_COMPLETED, RAMEN_API_VERSION, test_labels,
};
use crate::util::write_yaml;

const PLACEMENT_RESOURCE: &str = "cluster.open-cluster-management.io/placements";
const CLUSTER_SET_BINDING_RESOURCE: &str = "cluster.open-cluster-management.io/managedclustersetbindings";
const CLUSTER_SET: &str = "default";

const PHASE_DEPLOYED: &str = "Deployed";
const PHASE_FAILED_OVER: &str = "FailedOver";
const PHASE_RELOCATED: &str = "Relocated";
const PROGRESSION_WAIT_ON_USER_TO_CLEAN_UP: &str = "WaitOnUserToCleanUp";

const POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct KubectlActions {
    env: Env,
    namespaces: Namespaces,
    config: Config,
    work_dir: PathBuf,
}

impl KubectlActions {
    /// Generated kustomizations are written under `work_dir`.
    pub fn new(config: &Config, env: Env, work_dir: PathBuf) -> Self {
        Self {
            env,
            namespaces: config.namespaces(),
            config: config.clone(),
            work_dir,
        }
    }

    fn hub(&self) -> Kubectl {
        Kubectl::new(&self.env.hub)
    }

    fn ops_namespace(&self) -> &str {
        &self.namespaces.ramen_ops_namespace
    }

    fn write_kustomization(&self, test: &TestSpec) -> Result<PathBuf> {
        let pvc_spec = self
            .config
            .pvc_spec(&test.pvc_spec)
            .ok_or_else(|| anyhow!("test \"{}\": unknown pvcSpec \"{}\"", test.name(), test.pvc_spec))?;
        let dir = self.work_dir.join(test.name());
        write_yaml(
            &dir.join("kustomization.yaml"),
            &kustomization(test, &self.config.repo, pvc_spec)?,
        )?;
        Ok(dir)
    }

    fn apply_workload(&self, ctx: &Context, cluster: &Cluster, dir: &Path) -> Result<()> {
        let dir = dir.to_string_lossy();
        Kubectl::new(cluster).run(ctx, &["apply", "--kustomize", dir.as_ref()])?;
        info!(cluster = %cluster.name, "workload deployed");
        Ok(())
    }

    fn delete_workload(&self, ctx: &Context, cluster: &Cluster, test: &TestSpec) -> Result<()> {
        let dir = self.write_kustomization(test)?;
        let dir = dir.to_string_lossy();
        let timeout = format!("--timeout={}", request_timeout(ctx));
        Kubectl::new(cluster).run(
            ctx,
            &[
                "delete",
                "--kustomize",
                dir.as_ref(),
                "--ignore-not-found",
                "--wait",
                timeout.as_str(),
            ],
        )?;
        info!(cluster = %cluster.name, test = %test.name(), "workload deleted");
        Ok(())
    }

    fn delete_on_hub(&self, ctx: &Context, resource: &str, name: &str) -> Result<()> {
        let resource = resource_name(resource);
        let timeout = format!("--timeout={}", request_timeout(ctx));
        self.hub().run(
            ctx,
            &[
                "delete",
                resource.as_str(),
                name,
                "--namespace",
                self.ops_namespace(),
                "--ignore-not-found",
                "--wait",
                timeout.as_str(),
            ],
        )?;
        Ok(())
    }

    fn get_drpc(&self, ctx: &Context, test: &TestSpec) -> Result<DrPlacementControl> {
        let resource = resource_name(DRPC_RESOURCE);
        let name = test.name();
        self.hub().get_json(
            ctx,
            &["get", resource.as_str(), name.as_str(), "--namespace", self.ops_namespace()],
        )
    }

    fn patch_drpc(&self, ctx: &Context, test: &TestSpec, patch: &Value) -> Result<()> {
        let resource = resource_name(DRPC_RESOURCE);
        let name = test.name();
        let patch = patch.to_string();
        self.hub().run(
            ctx,
            &[
                "patch",
                resource.as_str(),
                name.as_str(),
                "--namespace",
                self.ops_namespace(),
                "--type",
                "merge",
                "--patch",
                patch.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Polls the DRPC until it reaches `phase` with a completed progression.
    /// When Ramen waits for the user to clean up, the workload is deleted
    /// from `previous`.
    fn wait_for_drpc(
        &self,
        ctx: &Context,
        test: &TestSpec,
        phase: &str,
        previous: Option<&Cluster>,
    ) -> Result<()> {
        let mut cleaned = false;
        loop {
            let drpc = self.get_drpc(ctx, test)?;
            if drpc.phase() == phase && drpc.progression() == PROGRESSION_COMPLETED {
                info!(test = %test.name(), phase, "drpc reached phase");
                return Ok(());
            }
            if drpc.progression() == PROGRESSION_WAIT_ON_USER_TO_CLEAN_UP && !cleaned {
                if let Some(cluster) = previous {
                    self.delete_workload(ctx, cluster, test)?;
                    cleaned = true;
                }
            }
            debug!(
                test = %test.name(),
                phase = drpc.phase(),
                progression = drpc.progression(),
                "waiting for drpc"
            );
            ctx.sleep(POLL_INTERVAL)?;
        }
    }

    fn current_primary(&self, ctx: &Context, test: &TestSpec) -> Result<&Cluster> {
        let drpc = self.get_drpc(ctx, test)?;
        let primary = drpc.primary_cluster();
        self.env
            .managed_cluster(primary)
            .ok_or_else(|| Error::InvalidPrimary(primary.to_string()))
    }
}

impl DrActions for KubectlActions {
    fn setup(&self, ctx: &Context) -> Result<()> {
        let hub = self.hub();
        hub.apply(ctx, &namespace_manifest(self.ops_namespace()).to_string())?;
        hub.apply(ctx, &cluster_set_binding_manifest(self.ops_namespace()).to_string())?;
        info!(namespace = self.ops_namespace(), "hub is ready for tests");
        Ok(())
    }

    fn deploy(&self, ctx: &Context, test: &TestSpec) -> Result<()> {
        if !test.is_discovered() {
            warn!(
                test = %test.name(),
                deployer = %test.deployer,
                "deploying as a discovered application"
            );
        }
        let manifest = namespace_manifest(&test.namespace()).to_string();
        for cluster in self.env.managed_clusters() {
            Kubectl::new(cluster).apply(ctx, &manifest)?;
        }
        let dir = self.write_kustomization(test)?;
        self.apply_workload(ctx, &self.env.c1, &dir)
    }

    fn protect(&self, ctx: &Context, test: &TestSpec) -> Result<()> {
        let hub = self.hub();
        hub.apply(
            ctx,
            &placement_manifest(test, self.ops_namespace(), &self.env.c1.name).to_string(),
        )?;
        let drpc = drpc_manifest(test, self.ops_namespace(), &self.config.dr_policy, &self.env.c1.name);
        hub.apply(ctx, &serde_json::to_string(&drpc)?)?;
        self.wait_for_drpc(ctx, test, PHASE_DEPLOYED, None)
    }

    fn failover(&self, ctx: &Context, test: &TestSpec) -> Result<()> {
        let primary = self.current_primary(ctx, test)?;
        let Some(target) = self.env.peer_cluster(&primary.name) else {
            return Err(Error::InvalidPrimary(primary.name.clone()));
        };
        info!(test = %test.name(), from = %primary.name, to = %target.name, "failing over");
        self.patch_drpc(
            ctx,
            test,
            &json!({"spec": {"action": ACTION_FAILOVER, "failoverCluster": target.name}}),
        )?;
        self.wait_for_drpc(ctx, test, PHASE_FAILED_OVER, Some(primary))
    }

    fn relocate(&self, ctx: &Context, test: &TestSpec) -> Result<()> {
        let primary = self.current_primary(ctx, test)?;
        let Some(target) = self.env.peer_cluster(&primary.name) else {
            return Err(Error::InvalidPrimary(primary.name.clone()));
        };
        info!(test = %test.name(), from = %primary.name, to = %target.name, "relocating");
        self.patch_drpc(
            ctx,
            test,
            &json!({"spec": {"action": ACTION_RELOCATE, "preferredCluster": target.name}}),
        )?;
        self.wait_for_drpc(ctx, test, PHASE_RELOCATED, Some(primary))
    }

    fn unprotect(&self, ctx: &Context, test: &TestSpec) -> Result<()> {
        let name = test.name();
        self.delete_on_hub(ctx, DRPC_RESOURCE, &name)?;
        self.delete_on_hub(ctx, PLACEMENT_RESOURCE, &name)?;
        info!(test = %name, "application unprotected");
        Ok(())
    }

    fn undeploy(&self, ctx: &Context, test: &TestSpec) -> Result<()> {
        let namespace = test.namespace();
        let timeout = format!("--timeout={}", request_timeout(ctx));
        for cluster in self.env.managed_clusters() {
            self.delete_workload(ctx, cluster, test)?;
            Kubectl::new(cluster).run(
                ctx,
                &[
                    "delete",
                    "namespace",
                    namespace.as_str(),
                    "--ignore-not-found",
                    "--wait",
                    timeout.as_str(),
                ],
            )?;
        }
        Ok(())
    }

    fn cleanup(&self, ctx: &Context) -> Result<()> {
        self.delete_on_hub(ctx, CLUSTER_SET_BINDING_RESOURCE, CLUSTER_SET)?;
        info!(namespace = self.ops_namespace(), "hub test resources deleted");
        Ok(())
    }
}

fn namespace_manifest(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {"name": name},
    })
}

fn cluster_set_binding_manifest(namespace: &str) -> Value {
    json!({
        "apiVersion": "cluster.open-cluster-management.io/v1beta2",
        "kind": "ManagedClusterSetBinding",
        "metadata": {"name": CLUSTER_SET, "namespace": namespace},
        "spec": {"clusterSet": CLUSTER_SET},
    })
}

fn placement_manifest(test: &TestSpec, namespace: &str, cluster: &str) -> Value {
    json!({
        "apiVersion": "cluster.open-cluster-management.io/v1beta1",
        "kind": "Placement",
        "metadata": {
            "name": test.name(),
            "namespace": namespace,
            "labels": test_labels(&test.name()),
            "annotations": {
                "cluster.open-cluster-management.io/experimental-scheduling-disable": "true",
            },
        },
        "spec": {
            "clusterSets": [CLUSTER_SET],
            "numberOfClusters": 1,
            "predicates": [{
                "requiredClusterSelector": {
                    "labelSelector": {
                        "matchExpressions": [{"key": "name", "operator": "In", "values": [cluster]}],
                    },
                },
            }],
        },
    })
}

fn drpc_manifest(test: &TestSpec, namespace: &str, dr_policy: &str, cluster: &str) -> DrPlacementControl {
    let name = test.name();
    DrPlacementControl {
        api_version: RAMEN_API_VERSION.to_string(),
        kind: "DRPlacementControl".to_string(),
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(test_labels(&name)),
            ..ObjectMeta::default()
        },
        spec: DrpcSpec {
            preferred_cluster: cluster.to_string(),
            dr_policy_ref: ObjectRef {
                name: dr_policy.to_string(),
                ..ObjectRef::default()
            },
            placement_ref: ObjectRef {
                kind: "Placement".to_string(),
                name: name.clone(),
                namespace: namespace.to_string(),
            },
            protected_namespaces: Some(vec![test.namespace()]),
            pvc_selector: LabelSelector {
                match_labels: Some(test_labels(&name)),
                ..LabelSelector::default()
            },
            ..DrpcSpec::default()
        },
        status: None,
    }
}

/// Kustomization deploying the workload into the test namespace with the
/// test's storage class.
fn kustomization(test: &TestSpec, repo: &Repo, pvc_spec: &PvcSpec) -> Result<Value> {
    let mut operations = vec![json!({
        "op": "replace",
        "path": "/spec/storageClassName",
        "value": pvc_spec.storage_class_name,
    })];
    if !pvc_spec.access_modes.is_empty() {
        operations.push(json!({
            "op": "replace",
            "path": "/spec/accessModes",
            "value": pvc_spec.access_modes,
        }));
    }
    let labels = test_labels(&test.name());

    Ok(json!({
        "apiVersion": "kustomize.config.k8s.io/v1beta1",
        "kind": "Kustomization",
        "namespace": test.namespace(),
        "resources": [repo.workload_url(&test.workload)],
        "labels": [{"pairs": labels, "includeSelectors": false}],
        "patches": [{
            "target": {"kind": "PersistentVolumeClaim"},
            "patch": serde_json::to_string(&operations)?,
        }],
    }))
}
