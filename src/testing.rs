//! Fixtures shared by unit tests: gathered resources written in the same
//! layout the gatherer produces.

use std::fs;
use std::path::Path;

use crate::env::Env;
use crate::output::OutputReader;
use crate::resources::{
    DEPLOYMENT_RESOURCE, DR_CLUSTER_OPERATOR, DRCLUSTER_RESOURCE, DRPC_RESOURCE,
    DRPOLICY_RESOURCE, HUB_OPERATOR, PVC_RESOURCE, VRG_RESOURCE,
};

pub const APP_NAME: &str = "busybox-drpc";
pub const APP_NAMESPACE: &str = "busybox";
pub const PVC_NAME: &str = "busybox-pvc";

pub fn write_resource(
    data_dir: &Path,
    cluster: &str,
    namespace: &str,
    resource: &str,
    name: &str,
    yaml: &str,
) {
    let path = OutputReader::new(data_dir.join(cluster)).resource_path(namespace, resource, name);
    fs::create_dir_all(path.parent().expect("resource parent")).expect("create resource dir");
    fs::write(&path, yaml).expect("write resource");
}

pub fn condition(type_: &str, status: &str, observed_generation: i64, reason: &str, message: &str) -> String {
    format!(
        "  - type: {type_}\n    status: \"{status}\"\n    observedGeneration: {observed_generation}\n    \
         reason: {reason}\n    message: \"{message}\"\n    lastTransitionTime: \"2026-01-01T00:00:00Z\"\n"
    )
}

pub fn indent(block: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    block
        .lines()
        .map(|line| format!("{pad}{line}\n"))
        .collect()
}

pub struct DrpcFixture<'a> {
    pub action: &'a str,
    pub phase: &'a str,
    pub progression: &'a str,
    pub preferred_cluster: &'a str,
    pub failover_cluster: &'a str,
    pub generation: i64,
    pub conditions: Vec<String>,
}

impl Default for DrpcFixture<'_> {
    fn default() -> Self {
        Self {
            action: "",
            phase: "Deployed",
            progression: "Completed",
            preferred_cluster: "dr1",
            failover_cluster: "",
            generation: 1,
            conditions: vec![
                condition("Available", "True", 1, "Deployed", "Initial deployment completed"),
                condition("PeerReady", "True", 1, "Success", "Ready"),
                condition("Protected", "True", 1, "Protected", "VRGs are protected"),
            ],
        }
    }
}

pub fn drpc_yaml(fixture: &DrpcFixture<'_>) -> String {
    let mut yaml = format!(
        "apiVersion: ramendr.openshift.io/v1alpha1\nkind: DRPlacementControl\nmetadata:\n  \
         name: {APP_NAME}\n  namespace: {APP_NAMESPACE}\n  generation: {}\nspec:\n  \
         preferredCluster: \"{}\"\n  failoverCluster: \"{}\"\n  drPolicyRef:\n    name: dr-policy\n  \
         placementRef:\n    kind: Placement\n    name: busybox-placement\n",
        fixture.generation, fixture.preferred_cluster, fixture.failover_cluster
    );
    if !fixture.action.is_empty() {
        yaml.push_str(&format!("  action: {}\n", fixture.action));
    }
    yaml.push_str(&format!(
        "status:\n  phase: \"{}\"\n  progression: \"{}\"\n  conditions:\n",
        fixture.phase, fixture.progression
    ));
    for condition in &fixture.conditions {
        yaml.push_str(&indent(condition, 2));
    }
    yaml
}

pub fn vrg_yaml(state: &str, generation: i64, conditions: &[String], pvc_conditions: &[String]) -> String {
    let mut yaml = format!(
        "apiVersion: ramendr.openshift.io/v1alpha1\nkind: VolumeReplicationGroup\nmetadata:\n  \
         name: {APP_NAME}\n  namespace: {APP_NAMESPACE}\n  generation: {generation}\nspec:\n  \
         replicationState: {}\nstatus:\n  state: {state}\n  conditions:\n",
        state.to_lowercase()
    );
    for condition in conditions {
        yaml.push_str(&indent(condition, 2));
    }
    if pvc_conditions.is_empty() {
        yaml.push_str("  protectedPVCs: []\n");
    } else {
        yaml.push_str(&format!(
            "  protectedPVCs:\n  - name: {PVC_NAME}\n    namespace: {APP_NAMESPACE}\n    conditions:\n"
        ));
        for condition in pvc_conditions {
            yaml.push_str(&indent(condition, 4));
        }
    }
    yaml
}

pub fn pvc_yaml(phase: &str, deleting: bool) -> String {
    let mut yaml = format!(
        "apiVersion: v1\nkind: PersistentVolumeClaim\nmetadata:\n  name: {PVC_NAME}\n  namespace: {APP_NAMESPACE}\n"
    );
    if deleting {
        yaml.push_str("  deletionTimestamp: \"2026-01-01T00:00:00Z\"\n");
    }
    yaml.push_str(&format!("status:\n  phase: {phase}\n"));
    yaml
}

pub fn primary_vrg_conditions(generation: i64) -> Vec<String> {
    vec![
        condition("DataReady", "True", generation, "Ready", "PVCs are ready"),
        condition("DataProtected", "False", generation, "Replicating", "PVCs are replicating"),
        condition("ClusterDataReady", "True", generation, "Restored", "Restored cluster data"),
        condition("ClusterDataProtected", "True", generation, "Uploaded", "Cluster data protected"),
    ]
}

pub fn secondary_vrg_conditions(generation: i64) -> Vec<String> {
    vec![
        condition("DataReady", "True", generation, "Unused", "Not used on secondary"),
        condition("NoClusterDataConflict", "True", generation, "NoConflictDetected", "No conflict"),
    ]
}

/// Writes a healthy application deployed on c1 and protected to c2.
pub fn write_healthy_application(data_dir: &Path, env: &Env) {
    write_resource(
        data_dir,
        &env.hub.name,
        APP_NAMESPACE,
        DRPC_RESOURCE,
        APP_NAME,
        &drpc_yaml(&DrpcFixture::default()),
    );
    write_resource(
        data_dir,
        &env.c1.name,
        APP_NAMESPACE,
        VRG_RESOURCE,
        APP_NAME,
        &vrg_yaml(
            "Primary",
            1,
            &primary_vrg_conditions(1),
            &[condition("DataReady", "True", 1, "Ready", "PVC in use")],
        ),
    );
    write_resource(
        data_dir,
        &env.c1.name,
        APP_NAMESPACE,
        PVC_RESOURCE,
        PVC_NAME,
        &pvc_yaml("Bound", false),
    );
    write_resource(
        data_dir,
        &env.c2.name,
        APP_NAMESPACE,
        VRG_RESOURCE,
        APP_NAME,
        &vrg_yaml("Secondary", 1, &secondary_vrg_conditions(1), &[]),
    );
}

pub fn deployment_yaml(name: &str, namespace: &str, available: &str) -> String {
    format!(
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {name}\n  namespace: {namespace}\n  \
         generation: 2\nspec:\n  selector:\n    matchLabels:\n      app: {name}\n  template:\n    \
         metadata:\n      labels:\n        app: {name}\n    spec:\n      containers: []\nstatus:\n  \
         observedGeneration: 2\n  conditions:\n  - type: Available\n    status: \"{available}\"\n    \
         message: Deployment has minimum availability.\n  - type: Progressing\n    status: \"True\"\n"
    )
}

pub fn drcluster_yaml(name: &str, fenced: &str) -> String {
    let mut yaml = format!(
        "apiVersion: ramendr.openshift.io/v1alpha1\nkind: DRCluster\nmetadata:\n  name: {name}\n  \
         generation: 1\nstatus:\n  phase: Available\n  conditions:\n"
    );
    yaml.push_str(&indent(&condition("Fenced", fenced, 1, "Clean", "Cluster clean"), 2));
    yaml.push_str(&indent(&condition("Clean", "True", 1, "Clean", "Cluster clean"), 2));
    yaml.push_str(&indent(&condition("Validated", "True", 1, "Succeeded", "Validated"), 2));
    yaml
}

pub fn drpolicy_yaml(name: &str, clusters: &[&str]) -> String {
    let mut yaml = format!(
        "apiVersion: ramendr.openshift.io/v1alpha1\nkind: DRPolicy\nmetadata:\n  name: {name}\n  \
         generation: 1\nspec:\n  schedulingInterval: 1m\n  drClusters:\n"
    );
    for cluster in clusters {
        yaml.push_str(&format!("  - {cluster}\n"));
    }
    yaml.push_str("status:\n  conditions:\n");
    yaml.push_str(&indent(&condition("Validated", "True", 1, "Succeeded", "drpolicy validated"), 2));
    yaml
}

/// Writes healthy Ramen resources for every cluster in `env`.
pub fn write_healthy_clusters(data_dir: &Path, env: &Env, hub_namespace: &str, dr_namespace: &str) {
    for cluster in env.managed_clusters() {
        write_resource(data_dir, &env.hub.name, "", DRCLUSTER_RESOURCE, &cluster.name, &drcluster_yaml(&cluster.name, "False"));
        write_resource(
            data_dir,
            &cluster.name,
            dr_namespace,
            DEPLOYMENT_RESOURCE,
            DR_CLUSTER_OPERATOR,
            &deployment_yaml(DR_CLUSTER_OPERATOR, dr_namespace, "True"),
        );
    }
    write_resource(
        data_dir,
        &env.hub.name,
        "",
        DRPOLICY_RESOURCE,
        "dr-policy",
        &drpolicy_yaml("dr-policy", &[&env.c1.name, &env.c2.name]),
    );
    write_resource(
        data_dir,
        &env.hub.name,
        hub_namespace,
        DEPLOYMENT_RESOURCE,
        HUB_OPERATOR,
        &deployment_yaml(HUB_OPERATOR, hub_namespace, "True"),
    );
}
