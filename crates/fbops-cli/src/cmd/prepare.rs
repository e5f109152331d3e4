use anyhow::Context;
use fbops_core::package;
use fbops_core::runner::SystemRunner;
use std::path::Path;

pub fn run(root: &Path, app: &str, packages: &str) -> anyhow::Result<()> {
    let packages = package::parse_package_list(packages);
    if packages.is_empty() {
        anyhow::bail!("no packages given; pass --packages <pkg1,pkg2,...>");
    }

    let mut stdout = std::io::stdout().lock();
    package::prepare_app(&SystemRunner, root, app, &packages, &mut stdout)
        .with_context(|| format!("failed to prepare '{app}' for deployment"))?;
    Ok(())
}
