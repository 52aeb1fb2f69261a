//! Engine configuration.

use std::env;
use std::path::{Path, PathBuf};

/// Options for one [`Engine`](crate::Engine).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Config {
    /// Package search roots, searched in order: `$GOROOT/src`, then each
    /// `$GOPATH/src`.
    pub lib_paths: Vec<PathBuf>,
    /// Offer predeclared identifiers (other than `Error`) as candidates.
    pub propose_builtins: bool,
    /// Complete `pkg.` for packages the file does not import yet.
    pub unimported_packages: bool,
    /// Upper bound on files being read from disk at once.
    pub max_concurrent_reads: usize,
    /// Directory listings kept in memory.
    pub dir_cache_capacity: usize,
    /// Worker threads for parallel parsing; 0 lets rayon decide.
    pub worker_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lib_paths: Vec::new(),
            propose_builtins: false,
            unimported_packages: false,
            max_concurrent_reads: 50,
            dir_cache_capacity: 200,
            worker_threads: 0,
        }
    }
}

impl Config {
    /// Search roots for a Go installation and workspace.
    ///
    /// `gopath` is a platform path list, like `$GOPATH` itself.
    pub fn from_go_env(goroot: Option<&Path>, gopath: Option<&str>) -> Self {
        let mut lib_paths = Vec::new();
        if let Some(root) = goroot {
            lib_paths.push(root.join("src"));
        }
        if let Some(gopath) = gopath {
            for entry in env::split_paths(gopath) {
                if !entry.as_os_str().is_empty() {
                    lib_paths.push(entry.join("src"));
                }
            }
        }
        Self {
            lib_paths,
            ..Self::default()
        }
    }

    /// [`Config::from_go_env`] with `GOROOT` and `GOPATH` read from the
    /// process environment.
    pub fn from_env() -> Self {
        let goroot = env::var_os("GOROOT").map(PathBuf::from);
        let gopath = env::var("GOPATH").ok();
        Self::from_go_env(goroot.as_deref(), gopath.as_deref())
    }

    pub fn with_lib_paths(mut self, lib_paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.lib_paths = lib_paths.into_iter().collect();
        self
    }

    pub fn with_propose_builtins(mut self, on: bool) -> Self {
        self.propose_builtins = on;
        self
    }

    pub fn with_unimported_packages(mut self, on: bool) -> Self {
        self.unimported_packages = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_reads, 50);
        assert_eq!(config.dir_cache_capacity, 200);
        assert!(!config.propose_builtins);
        assert!(config.lib_paths.is_empty());
    }

    #[test]
    fn test_from_go_env() {
        let gopath = env::join_paths(["/home/me/go", "/opt/go"]).expect("join");
        let config = Config::from_go_env(Some(Path::new("/usr/local/go")), gopath.to_str());
        assert_eq!(
            config.lib_paths,
            [
                PathBuf::from("/usr/local/go/src"),
                PathBuf::from("/home/me/go/src"),
                PathBuf::from("/opt/go/src"),
            ]
        );
    }
}
