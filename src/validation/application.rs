use std::path::Path;

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    CONDITION_TRUE, ValidatedCondition, ValidatedValue, ValidationState, expected_vrg_condition_status,
    validate_conditions, validate_value,
};
use crate::env::{Cluster, Env};
use crate::error::{Error, Result};
use crate::output::OutputReader;
use crate::report::Summary;
use crate::resources::{
    ConditionView, DRPC_RESOURCE, DrPlacementControl, PROGRESSION_COMPLETED, PVC_RESOURCE,
    ProtectedPvc, VRG_RESOURCE, VolumeReplicationGroup,
};

const PVC_BOUND: &str = "Bound";
const VRG_PRIMARY: &str = "Primary";
const VRG_SECONDARY: &str = "Secondary";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    pub hub: HubApplicationStatus,
    pub primary_cluster: ClusterApplicationStatus,
    pub secondary_cluster: ClusterApplicationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubApplicationStatus {
    pub drpc: DrpcSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrpcSummary {
    pub name: String,
    pub namespace: String,
    pub dr_policy: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,
    pub phase: String,
    pub progression: ValidatedValue,
    #[serde(default)]
    pub conditions: Vec<ValidatedCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterApplicationStatus {
    pub name: String,
    pub vrg: VrgSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VrgSummary {
    pub name: String,
    pub namespace: String,
    pub state: ValidatedValue,
    #[serde(default)]
    pub conditions: Vec<ValidatedCondition>,
    #[serde(default, rename = "protectedPVCs", skip_serializing_if = "Vec::is_empty")]
    pub protected_pvcs: Vec<PvcSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvcSummary {
    pub name: String,
    pub namespace: String,
    pub phase: ValidatedValue,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub conditions: Vec<ValidatedCondition>,
}

/// Validates the DR state of one application from data gathered under
/// `data_dir/<cluster>`.
///
/// A missing DRPC or VRG, or a primary cluster that is not one of the
/// managed clusters, aborts validation. Everything else is classified and
/// counted in `summary`.
pub fn validate_application(
    data_dir: &Path,
    env: &Env,
    drpc_name: &str,
    drpc_namespace: &str,
    summary: &mut Summary,
) -> Result<ApplicationStatus> {
    let hub = OutputReader::new(data_dir.join(&env.hub.name));
    let drpc: DrPlacementControl = hub.read(drpc_namespace, DRPC_RESOURCE, drpc_name)?;
    let drpc_summary = summarize_drpc(&drpc, summary);

    let primary_name = drpc.primary_cluster();
    let primary = env
        .managed_cluster(primary_name)
        .ok_or_else(|| Error::InvalidPrimary(primary_name.to_string()))?;
    let secondary = env
        .peer_cluster(&primary.name)
        .ok_or_else(|| Error::InvalidPrimary(primary_name.to_string()))?;

    debug!(primary = %primary.name, secondary = %secondary.name, "resolved application clusters");

    let primary_cluster = validate_cluster(data_dir, primary, &drpc, VRG_PRIMARY, summary)?;
    let secondary_cluster = validate_cluster(data_dir, secondary, &drpc, VRG_SECONDARY, summary)?;

    Ok(ApplicationStatus {
        hub: HubApplicationStatus { drpc: drpc_summary },
        primary_cluster,
        secondary_cluster,
    })
}

fn summarize_drpc(drpc: &DrPlacementControl, summary: &mut Summary) -> DrpcSummary {
    let conditions = validate_conditions(
        drpc.conditions().iter().map(ConditionView::from),
        drpc.generation(),
        |_| CONDITION_TRUE,
        summary,
    );

    DrpcSummary {
        name: drpc.name().to_string(),
        namespace: drpc.namespace().to_string(),
        dr_policy: drpc.spec.dr_policy_ref.name.clone(),
        action: drpc.spec.action.clone(),
        phase: drpc.phase().to_string(),
        progression: validate_value(drpc.progression(), PROGRESSION_COMPLETED, summary),
        conditions,
    }
}

fn validate_cluster(
    data_dir: &Path,
    cluster: &Cluster,
    drpc: &DrPlacementControl,
    expected_state: &str,
    summary: &mut Summary,
) -> Result<ClusterApplicationStatus> {
    let reader = OutputReader::new(data_dir.join(&cluster.name));
    let vrg_namespace = drpc.vrg_namespace();
    let vrg: VolumeReplicationGroup = reader.read(vrg_namespace, VRG_RESOURCE, drpc.name())?;

    let action = drpc.spec.action.as_str();
    let phase = drpc.phase();
    let expected = |condition_type: &str| expected_vrg_condition_status(condition_type, action, phase);

    let conditions = validate_conditions(
        vrg.conditions().iter().map(ConditionView::from),
        vrg.generation(),
        expected,
        summary,
    );
    let state = validate_value(vrg.state(), expected_state, summary);

    let mut protected_pvcs = Vec::with_capacity(vrg.protected_pvcs().len());
    for pvc in vrg.protected_pvcs() {
        protected_pvcs.push(validate_protected_pvc(
            &reader,
            pvc,
            vrg.generation(),
            &expected,
            summary,
        )?);
    }

    Ok(ClusterApplicationStatus {
        name: cluster.name.clone(),
        vrg: VrgSummary {
            name: drpc.name().to_string(),
            namespace: vrg_namespace.to_string(),
            state,
            conditions,
            protected_pvcs,
        },
    })
}

fn validate_protected_pvc(
    reader: &OutputReader,
    pvc: &ProtectedPvc,
    generation: i64,
    expected: &dyn Fn(&str) -> &'static str,
    summary: &mut Summary,
) -> Result<PvcSummary> {
    let conditions = validate_conditions(
        pvc.conditions.iter().map(ConditionView::from),
        generation,
        expected,
        summary,
    );

    let (phase, deleted) = match reader.read::<PersistentVolumeClaim>(&pvc.namespace, PVC_RESOURCE, &pvc.name) {
        Ok(live) => {
            let deleted = live.metadata.deletion_timestamp.is_some();
            let observed = live
                .status
                .as_ref()
                .and_then(|status| status.phase.clone())
                .unwrap_or_default();
            let phase = if deleted {
                summary.add(ValidationState::Problem);
                ValidatedValue {
                    value: observed,
                    state: ValidationState::Problem,
                    description: "PVC is being deleted".to_string(),
                }
            } else {
                validate_value(&observed, PVC_BOUND, summary)
            };
            (phase, deleted)
        }
        Err(Error::NotFound { .. }) => {
            summary.add(ValidationState::Problem);
            let phase = ValidatedValue {
                value: String::new(),
                state: ValidationState::Problem,
                description: "PVC not found".to_string(),
            };
            (phase, false)
        }
        Err(err) => return Err(err),
    };

    Ok(PvcSummary {
        name: pvc.name.clone(),
        namespace: pvc.namespace.clone(),
        phase,
        deleted,
        conditions,
    })
}
