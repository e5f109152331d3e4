use std::path::{Path, PathBuf};

const WORKSPACE_MARKER: &str = "pnpm-workspace.yaml";

/// Resolve the monorepo root for `prepare-deploy`.
///
/// Priority:
/// 1. `--root` flag / `FBOPS_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of `cwd` holding `pnpm-workspace.yaml`
/// 3. Nearest ancestor of `cwd` holding `.git/`
/// 4. `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    root_from(&cwd)
}

fn root_from(start: &Path) -> PathBuf {
    find_upward(start, |dir| dir.join(WORKSPACE_MARKER).is_file())
        .or_else(|| find_upward(start, |dir| dir.join(".git").is_dir()))
        .unwrap_or_else(|| start.to_path_buf())
}

fn find_upward(start: &Path, matches: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| matches(dir))
        .map(Path::to_path_buf)
}
