//! Command configuration loaded from a YAML file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DR_POLICY: &str = "dr-policy";
pub const DISCOVERED_DEPLOYER: &str = "disapp";
pub const DEPLOYERS: &[&str] = &["appset", "subscr", DISCOVERED_DEPLOYER];
pub const DEFAULT_REPO_URL: &str = "https://github.com/RamenDR/ocm-ramen-samples";
pub const DEFAULT_REPO_BRANCH: &str = "main";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distro {
    #[default]
    K8s,
    Ocp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub distro: Distro,
    pub clusters: Clusters,
    #[serde(default)]
    pub namespaces: Option<Namespaces>,
    #[serde(default = "default_dr_policy")]
    pub dr_policy: String,
    #[serde(default)]
    pub repo: Repo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pvc_specs: Vec<PvcSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clusters {
    pub hub: ClusterConfig,
    pub c1: ClusterConfig,
    pub c2: ClusterConfig,
    #[serde(
        default,
        rename = "passive-hub",
        skip_serializing_if = "Option::is_none"
    )]
    pub passive_hub: Option<ClusterConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub kubeconfig: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespaces {
    pub ramen_hub_namespace: String,
    #[serde(rename = "ramenDRClusterNamespace")]
    pub ramen_dr_cluster_namespace: String,
    pub ramen_ops_namespace: String,
}

impl Namespaces {
    pub fn for_distro(distro: Distro) -> Self {
        match distro {
            Distro::K8s => Self {
                ramen_hub_namespace: "ramen-system".to_string(),
                ramen_dr_cluster_namespace: "ramen-system".to_string(),
                ramen_ops_namespace: "ramen-ops".to_string(),
            },
            Distro::Ocp => Self {
                ramen_hub_namespace: "openshift-operators".to_string(),
                ramen_dr_cluster_namespace: "openshift-dr-system".to_string(),
                ramen_ops_namespace: "openshift-dr-ops".to_string(),
            },
        }
    }
}

/// Git repository holding the test workloads, one kustomization per
/// `workloads/<workload>` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    #[serde(default = "default_repo_url")]
    pub url: String,
    #[serde(default = "default_repo_branch")]
    pub branch: String,
}

impl Default for Repo {
    fn default() -> Self {
        Self {
            url: default_repo_url(),
            branch: default_repo_branch(),
        }
    }
}

impl Repo {
    /// Remote kustomize target for `workload`.
    pub fn workload_url(&self, workload: &str) -> String {
        format!(
            "{}/workloads/{workload}?ref={}",
            self.url.trim_end_matches('/').trim_end_matches(".git"),
            self.branch
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvcSpec {
    pub name: String,
    pub storage_class_name: String,
    #[serde(default)]
    pub access_modes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSpec {
    pub workload: String,
    pub deployer: String,
    pub pvc_spec: String,
}

impl TestSpec {
    pub fn name(&self) -> String {
        format!("{}-{}-{}", self.deployer, self.workload, self.pvc_spec)
    }

    /// Whether the test deploys a discovered application, the only kind the
    /// kubectl actions manage natively.
    pub fn is_discovered(&self) -> bool {
        self.deployer == DISCOVERED_DEPLOYER
    }

    /// Namespace holding the test workload on the managed clusters.
    pub fn namespace(&self) -> String {
        format!("e2e-{}", self.name())
    }
}

fn default_dr_policy() -> String {
    DEFAULT_DR_POLICY.to_string()
}

fn default_repo_url() -> String {
    DEFAULT_REPO_URL.to_string()
}

fn default_repo_branch() -> String {
    DEFAULT_REPO_BRANCH.to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_slice(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn pvc_spec(&self, name: &str) -> Option<&PvcSpec> {
        self.pvc_specs.iter().find(|spec| spec.name == name)
    }

    pub fn namespaces(&self) -> Namespaces {
        self.namespaces
            .clone()
            .unwrap_or_else(|| Namespaces::for_distro(self.distro))
    }

    pub fn validate(&self) -> Result<()> {
        let label = Regex::new(r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?$")
            .context("failed to compile cluster name regex")?;

        let mut seen = HashSet::new();
        for (role, cluster) in self.clusters.iter() {
            if cluster.kubeconfig.as_os_str().is_empty() {
                bail!("cluster \"{role}\": kubeconfig is required");
            }
            let name = cluster.name_or(role);
            if !label.is_match(name) {
                bail!("cluster \"{role}\": invalid name \"{name}\"");
            }
            if !seen.insert(name.to_string()) {
                bail!("cluster \"{role}\": duplicate name \"{name}\"");
            }
        }

        let pvc_specs = self
            .pvc_specs
            .iter()
            .map(|spec| spec.name.as_str())
            .collect::<HashSet<&str>>();
        for test in &self.tests {
            if !DEPLOYERS.contains(&test.deployer.as_str()) {
                bail!(
                    "test \"{}\": unknown deployer \"{}\" (expected one of {})",
                    test.name(),
                    test.deployer,
                    DEPLOYERS.join(", ")
                );
            }
            if !pvc_specs.contains(test.pvc_spec.as_str()) {
                bail!(
                    "test \"{}\": unknown pvcSpec \"{}\"",
                    test.name(),
                    test.pvc_spec
                );
            }
        }

        Ok(())
    }
}

impl Clusters {
    /// Configured clusters paired with their role key, hub first.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ClusterConfig)> {
        [("hub", &self.hub), ("c1", &self.c1), ("c2", &self.c2)]
            .into_iter()
            .chain(self.passive_hub.as_ref().map(|cluster| ("passive-hub", cluster)))
    }
}

impl ClusterConfig {
    pub fn name_or<'a>(&'a self, role: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(role)
    }
}
