use anyhow::Result;

use super::{Command, GATHER_TIMEOUT};

/// `gather application`: gathers the application namespaces from every
/// cluster for offline inspection.
pub fn application(cmd: &mut Command, drpc_name: &str, drpc_namespace: &str) -> Result<()> {
    cmd.set_application(drpc_name, drpc_namespace);

    if !cmd.validate_config() {
        return cmd.failed();
    }
    if !gather_data(cmd, drpc_name, drpc_namespace) {
        return cmd.failed();
    }
    cmd.passed()
}

fn gather_data(cmd: &mut Command, drpc_name: &str, drpc_namespace: &str) -> bool {
    let timer = cmd.start_step("gather data");
    let scope = cmd.context().with_timeout(GATHER_TIMEOUT);

    let (inspect, namespaces) = cmd.inspect_application(&scope, drpc_name, drpc_namespace);
    let mut items = vec![inspect];
    if let Some(namespaces) = namespaces {
        let clusters = cmd.env().clusters();
        items.extend(cmd.gather_clusters(&scope, &clusters, &namespaces));
    }

    cmd.finish_step(timer, items)
}
