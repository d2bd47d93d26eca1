use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ClusterConfig, Config};

/// A cluster the command talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub kubeconfig: PathBuf,
}

impl Cluster {
    fn from_config(role: &str, config: &ClusterConfig) -> Self {
        Self {
            name: config.name_or(role).to_string(),
            kubeconfig: config.kubeconfig.clone(),
        }
    }
}

/// The hub and the two managed clusters an application moves between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Env {
    pub hub: Cluster,
    pub c1: Cluster,
    pub c2: Cluster,
    pub passive_hub: Option<Cluster>,
}

impl Env {
    pub fn from_config(config: &Config) -> Self {
        let clusters = &config.clusters;
        Self {
            hub: Cluster::from_config("hub", &clusters.hub),
            c1: Cluster::from_config("c1", &clusters.c1),
            c2: Cluster::from_config("c2", &clusters.c2),
            passive_hub: clusters
                .passive_hub
                .as_ref()
                .map(|cluster| Cluster::from_config("passive-hub", cluster)),
        }
    }

    /// All clusters in a stable order: hub, c1, c2, then the passive hub.
    pub fn clusters(&self) -> Vec<Cluster> {
        let mut clusters = vec![self.hub.clone(), self.c1.clone(), self.c2.clone()];
        clusters.extend(self.passive_hub.clone());
        clusters
    }

    pub fn managed_clusters(&self) -> [&Cluster; 2] {
        [&self.c1, &self.c2]
    }

    pub fn managed_cluster(&self, name: &str) -> Option<&Cluster> {
        self.managed_clusters()
            .into_iter()
            .find(|cluster| cluster.name == name)
    }

    /// The managed cluster paired with `name`: c1 for c2 and c2 for c1.
    pub fn peer_cluster(&self, name: &str) -> Option<&Cluster> {
        if name == self.c1.name {
            Some(&self.c2)
        } else if name == self.c2.name {
            Some(&self.c1)
        } else {
            None
        }
    }
}
