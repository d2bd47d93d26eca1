use std::path::Path;

use k8s_openapi::api::apps::v1::Deployment;
use serde::{Deserialize, Serialize};

use super::{
    CONDITION_FALSE, CONDITION_TRUE, Validated, ValidatedCondition, ValidationState,
    validate_conditions,
};
use crate::config::Namespaces;
use crate::env::{Cluster, Env};
use crate::error::{Error, Result};
use crate::output::OutputReader;
use crate::report::Summary;
use crate::resources::{
    ConditionView, DEPLOYMENT_RESOURCE, DR_CLUSTER_OPERATOR, DRCLUSTER_RESOURCE,
    DRPOLICY_RESOURCE, DrCluster, DrPolicy, HUB_OPERATOR, deployment_conditions,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClustersStatus {
    pub hub: HubClustersStatus,
    #[serde(default)]
    pub clusters: Vec<ManagedClusterStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubClustersStatus {
    pub name: String,
    #[serde(default)]
    pub drclusters: Vec<DrClusterSummary>,
    #[serde(default)]
    pub drpolicies: Vec<DrPolicySummary>,
    pub operator: DeploymentSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterStatus {
    pub name: String,
    pub operator: DeploymentSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrClusterSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phase: String,
    #[serde(default)]
    pub conditions: Vec<ValidatedCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrPolicySummary {
    pub name: String,
    #[serde(default)]
    pub dr_clusters: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<ValidatedCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    pub name: String,
    pub namespace: String,
    pub exists: Validated,
    #[serde(default)]
    pub conditions: Vec<ValidatedCondition>,
}

/// Validates Ramen resources gathered from every cluster under
/// `data_dir/<cluster>`. A hub without any DRCluster aborts validation.
pub fn validate_clusters(
    data_dir: &Path,
    env: &Env,
    namespaces: &Namespaces,
    summary: &mut Summary,
) -> Result<ClustersStatus> {
    let hub = OutputReader::new(data_dir.join(&env.hub.name));

    let drcluster_names = hub.list_resources("", DRCLUSTER_RESOURCE)?;
    if drcluster_names.is_empty() {
        return Err(Error::not_found("drcluster", "*"));
    }

    let mut drclusters = Vec::with_capacity(drcluster_names.len());
    for name in &drcluster_names {
        let drcluster: DrCluster = hub.read("", DRCLUSTER_RESOURCE, name)?;
        drclusters.push(DrClusterSummary {
            name: name.clone(),
            phase: drcluster
                .status
                .as_ref()
                .map(|status| status.phase.clone())
                .unwrap_or_default(),
            conditions: validate_conditions(
                drcluster.conditions().iter().map(ConditionView::from),
                drcluster.metadata.generation.unwrap_or_default(),
                expected_drcluster_condition_status,
                summary,
            ),
        });
    }

    let mut drpolicies = Vec::new();
    for name in hub.list_resources("", DRPOLICY_RESOURCE)? {
        let drpolicy: DrPolicy = hub.read("", DRPOLICY_RESOURCE, &name)?;
        drpolicies.push(DrPolicySummary {
            dr_clusters: drpolicy.spec.dr_clusters.clone(),
            conditions: validate_conditions(
                drpolicy.conditions().iter().map(ConditionView::from),
                drpolicy.metadata.generation.unwrap_or_default(),
                |_| CONDITION_TRUE,
                summary,
            ),
            name,
        });
    }

    let operator = validate_operator(
        &hub,
        &namespaces.ramen_hub_namespace,
        HUB_OPERATOR,
        summary,
    )?;

    let mut clusters = Vec::new();
    for cluster in env.managed_clusters() {
        clusters.push(validate_managed_cluster(data_dir, cluster, namespaces, summary)?);
    }

    Ok(ClustersStatus {
        hub: HubClustersStatus {
            name: env.hub.name.clone(),
            drclusters,
            drpolicies,
            operator,
        },
        clusters,
    })
}

/// A fenced DRCluster cannot run workloads, so `Fenced` must be False.
pub fn expected_drcluster_condition_status(condition_type: &str) -> &'static str {
    match condition_type {
        "Fenced" => CONDITION_FALSE,
        _ => CONDITION_TRUE,
    }
}

fn expected_deployment_condition_status(condition_type: &str) -> &'static str {
    match condition_type {
        "ReplicaFailure" => CONDITION_FALSE,
        _ => CONDITION_TRUE,
    }
}

fn validate_managed_cluster(
    data_dir: &Path,
    cluster: &Cluster,
    namespaces: &Namespaces,
    summary: &mut Summary,
) -> Result<ManagedClusterStatus> {
    let reader = OutputReader::new(data_dir.join(&cluster.name));
    let operator = validate_operator(
        &reader,
        &namespaces.ramen_dr_cluster_namespace,
        DR_CLUSTER_OPERATOR,
        summary,
    )?;
    Ok(ManagedClusterStatus {
        name: cluster.name.clone(),
        operator,
    })
}

fn validate_operator(
    reader: &OutputReader,
    namespace: &str,
    name: &str,
    summary: &mut Summary,
) -> Result<DeploymentSummary> {
    let deployment = match reader.read::<Deployment>(namespace, DEPLOYMENT_RESOURCE, name) {
        Ok(deployment) => deployment,
        Err(Error::NotFound { .. }) => {
            summary.add(ValidationState::Problem);
            return Ok(DeploymentSummary {
                name: name.to_string(),
                namespace: namespace.to_string(),
                exists: Validated::problem("Deployment not found"),
                conditions: Vec::new(),
            });
        }
        Err(err) => return Err(err),
    };

    summary.add(ValidationState::Ok);
    let conditions = validate_conditions(
        deployment_conditions(&deployment),
        deployment.metadata.generation.unwrap_or_default(),
        expected_deployment_condition_status,
        summary,
    );

    Ok(DeploymentSummary {
        name: name.to_string(),
        namespace: namespace.to_string(),
        exists: Validated::ok(),
        conditions,
    })
}
