//! Ramen custom resources, reduced to the fields the validators and DR
//! actions read or write. Core Kubernetes types come from `k8s-openapi`.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, LabelSelector, ObjectMeta};
use serde::{Deserialize, Serialize};

pub const RAMEN_API_VERSION: &str = "ramendr.openshift.io/v1alpha1";

/// Gathered resource directories, `<group>/<plural>` or `<plural>` for core.
pub const DRPC_RESOURCE: &str = "ramendr.openshift.io/drplacementcontrols";
pub const VRG_RESOURCE: &str = "ramendr.openshift.io/volumereplicationgroups";
pub const DRCLUSTER_RESOURCE: &str = "ramendr.openshift.io/drclusters";
pub const DRPOLICY_RESOURCE: &str = "ramendr.openshift.io/drpolicies";
pub const PVC_RESOURCE: &str = "persistentvolumeclaims";
pub const DEPLOYMENT_RESOURCE: &str = "apps/deployments";

pub const APP_NAMESPACE_ANNOTATION: &str = "drplacementcontrol.ramendr.openshift.io/app-namespace";

pub const HUB_OPERATOR: &str = "ramen-hub-operator";
pub const DR_CLUSTER_OPERATOR: &str = "ramen-dr-cluster-operator";

pub const ACTION_FAILOVER: &str = "Failover";
pub const ACTION_RELOCATE: &str = "Relocate";
pub const PHASE_RELOCATING: &str = "Relocating";
pub const PROGRESSION_COMPLETED: &str = "Completed";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrPlacementControl {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: DrpcSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DrpcStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrpcSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preferred_cluster: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub failover_cluster: String,
    #[serde(default)]
    pub dr_policy_ref: ObjectRef,
    #[serde(default)]
    pub placement_ref: ObjectRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected_namespaces: Option<Vec<String>>,
    #[serde(default)]
    pub pvc_selector: LabelSelector,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrpcStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub progression: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl DrPlacementControl {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    pub fn generation(&self) -> i64 {
        self.metadata.generation.unwrap_or_default()
    }

    pub fn phase(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.phase.as_str())
            .unwrap_or_default()
    }

    pub fn progression(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.progression.as_str())
            .unwrap_or_default()
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|status| status.conditions.as_slice())
            .unwrap_or_default()
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
    }

    /// Namespace of the VRGs on the managed clusters: the `app-namespace`
    /// annotation when set, otherwise the DRPC namespace.
    pub fn vrg_namespace(&self) -> &str {
        self.annotation(APP_NAMESPACE_ANNOTATION)
            .filter(|namespace| !namespace.is_empty())
            .unwrap_or_else(|| self.namespace())
    }

    /// Cluster the application should be running on now.
    pub fn primary_cluster(&self) -> &str {
        if self.spec.action == ACTION_FAILOVER {
            &self.spec.failover_cluster
        } else {
            &self.spec.preferred_cluster
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeReplicationGroup {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: VrgSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VrgStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VrgSpec {
    #[serde(default)]
    pub replication_state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VrgStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, rename = "protectedPVCs")]
    pub protected_pvcs: Vec<ProtectedPvc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedPvc {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl VolumeReplicationGroup {
    pub fn generation(&self) -> i64 {
        self.metadata.generation.unwrap_or_default()
    }

    pub fn state(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.state.as_str())
            .unwrap_or_default()
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|status| status.conditions.as_slice())
            .unwrap_or_default()
    }

    pub fn protected_pvcs(&self) -> &[ProtectedPvc] {
        self.status
            .as_ref()
            .map(|status| status.protected_pvcs.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrCluster {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConditionedStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrPolicy {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: DrPolicySpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConditionedStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrPolicySpec {
    #[serde(default)]
    pub dr_clusters: Vec<String>,
    #[serde(default)]
    pub scheduling_interval: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionedStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

fn conditions_of(status: Option<&ConditionedStatus>) -> &[Condition] {
    status
        .map(|status| status.conditions.as_slice())
        .unwrap_or_default()
}

impl DrCluster {
    pub fn conditions(&self) -> &[Condition] {
        conditions_of(self.status.as_ref())
    }
}

impl DrPolicy {
    pub fn conditions(&self) -> &[Condition] {
        conditions_of(self.status.as_ref())
    }
}

/// The fields of a status condition the classifier looks at, shared by
/// `metav1.Condition` and workload conditions that carry no
/// per-condition generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionView {
    pub type_: String,
    pub status: String,
    pub observed_generation: Option<i64>,
    pub reason: String,
    pub message: String,
}

impl From<&Condition> for ConditionView {
    fn from(condition: &Condition) -> Self {
        Self {
            type_: condition.type_.clone(),
            status: condition.status.clone(),
            observed_generation: condition.observed_generation,
            reason: condition.reason.clone(),
            message: condition.message.clone(),
        }
    }
}

/// Deployment conditions judged against the deployment's observed generation.
pub fn deployment_conditions(deployment: &Deployment) -> Vec<ConditionView> {
    let Some(status) = deployment.status.as_ref() else {
        return Vec::new();
    };
    status
        .conditions
        .iter()
        .flatten()
        .map(|condition| ConditionView {
            type_: condition.type_.clone(),
            status: condition.status.clone(),
            observed_generation: status.observed_generation,
            reason: condition.reason.clone().unwrap_or_default(),
            message: condition.message.clone().unwrap_or_default(),
        })
        .collect()
}

/// Labels applied to everything the DR test actions create.
pub fn test_labels(test_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("appname".to_string(), test_name.to_string())])
}
