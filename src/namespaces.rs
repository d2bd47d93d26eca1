//! Namespace set resolution for gathering and validating an application.
//!
//! Results are deduplicated and sorted, because gather order decides the
//! order of the per-cluster steps in the report.

use std::collections::BTreeSet;

use crate::config::Namespaces;
use crate::resources::{APP_NAMESPACE_ANNOTATION, DrPlacementControl};

/// The Ramen system namespaces gathered for every command.
pub fn ramen_namespaces(namespaces: &Namespaces) -> Vec<String> {
    merge(
        [
            namespaces.ramen_hub_namespace.as_str(),
            namespaces.ramen_dr_cluster_namespace.as_str(),
        ],
        std::iter::empty::<&str>(),
    )
}

/// Namespaces to gather for the application protected by `drpc`.
pub fn application_namespaces(drpc: &DrPlacementControl, namespaces: &Namespaces) -> Vec<String> {
    let mut set = BTreeSet::new();
    set.insert(namespaces.ramen_hub_namespace.clone());
    set.insert(namespaces.ramen_dr_cluster_namespace.clone());
    set.insert(drpc.namespace().to_string());

    for namespace in drpc.spec.protected_namespaces.iter().flatten() {
        if !namespace.is_empty() {
            set.insert(namespace.clone());
        }
    }

    if let Some(namespace) = drpc.annotation(APP_NAMESPACE_ANNOTATION) {
        if !namespace.is_empty() {
            set.insert(namespace.to_string());
        }
    }

    set.into_iter().collect()
}

/// Sorted union of two namespace lists, ignoring empty names.
pub fn merge<A, B>(first: A, second: B) -> Vec<String>
where
    A: IntoIterator,
    A::Item: AsRef<str>,
    B: IntoIterator,
    B::Item: AsRef<str>,
{
    let mut set = BTreeSet::new();
    for namespace in first.into_iter().map(|n| n.as_ref().to_string()) {
        set.insert(namespace);
    }
    for namespace in second.into_iter().map(|n| n.as_ref().to_string()) {
        set.insert(namespace);
    }
    set.remove("");
    set.into_iter().collect()
}
