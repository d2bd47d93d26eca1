//! Access to resources gathered from one cluster.
//!
//! Layout under a cluster directory:
//! `namespaces/<namespace>/<resource>/<name>.yaml` for namespaced objects and
//! `cluster/<resource>/<name>.yaml` for cluster-scoped ones, where
//! `<resource>` is `<group>/<plural>` (or `<plural>` for the core group).

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct OutputReader {
    root: PathBuf,
}

impl OutputReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory of `resource` objects; an empty namespace selects
    /// cluster-scoped objects.
    pub fn resource_dir(&self, namespace: &str, resource: &str) -> PathBuf {
        let base = if namespace.is_empty() {
            self.root.join("cluster")
        } else {
            self.root.join("namespaces").join(namespace)
        };
        base.join(resource)
    }

    pub fn resource_path(&self, namespace: &str, resource: &str, name: &str) -> PathBuf {
        self.resource_dir(namespace, resource)
            .join(format!("{name}.yaml"))
    }

    pub fn read_resource(&self, namespace: &str, resource: &str, name: &str) -> Result<Vec<u8>> {
        let path = self.resource_path(namespace, resource, name);
        fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => Error::not_found(resource, qualified(namespace, name)),
            _ => Error::Io(err),
        })
    }

    /// Names of gathered `resource` objects, sorted; empty when nothing
    /// was gathered.
    pub fn list_resources(&self, namespace: &str, resource: &str) -> Result<Vec<String>> {
        let dir = self.resource_dir(namespace, resource);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Error::Io(err)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn read<T: DeserializeOwned>(&self, namespace: &str, resource: &str, name: &str) -> Result<T> {
        let raw = self.read_resource(namespace, resource, name)?;
        Ok(serde_yaml::from_slice(&raw)?)
    }
}

fn qualified(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_resource_maps_missing_file_to_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reader = OutputReader::new(dir.path());
        let err = reader
            .read_resource("busybox", "persistentvolumeclaims", "busybox-pvc")
            .expect_err("nothing gathered");
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(
            err.to_string(),
            "persistentvolumeclaims \"busybox/busybox-pvc\" not found"
        );
    }

    #[test]
    fn list_resources_returns_sorted_yaml_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reader = OutputReader::new(dir.path());
        let resource_dir = reader.resource_dir("", "ramendr.openshift.io/drclusters");
        fs::create_dir_all(&resource_dir).expect("mkdir");
        fs::write(resource_dir.join("dr2.yaml"), "{}").expect("write");
        fs::write(resource_dir.join("dr1.yaml"), "{}").expect("write");
        fs::write(resource_dir.join("notes.txt"), "").expect("write");

        let names = reader
            .list_resources("", "ramendr.openshift.io/drclusters")
            .expect("list");
        assert_eq!(names, vec!["dr1", "dr2"]);
    }

    #[test]
    fn list_resources_of_missing_directory_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reader = OutputReader::new(dir.path());
        let names = reader.list_resources("missing", "pods").expect("list");
        assert!(names.is_empty());
    }

    #[test]
    fn namespaced_and_cluster_paths_differ() {
        let reader = OutputReader::new("/data/hub");
        assert_eq!(
            reader.resource_path("ns", "apps/deployments", "web"),
            PathBuf::from("/data/hub/namespaces/ns/apps/deployments/web.yaml")
        );
        assert_eq!(
            reader.resource_path("", "ramendr.openshift.io/drpolicies", "p"),
            PathBuf::from("/data/hub/cluster/ramendr.openshift.io/drpolicies/p.yaml")
        );
    }
}
