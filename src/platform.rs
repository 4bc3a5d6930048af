//! # Platform-specific utilities
//!
//! Questo modulo risolve i binari esterni (oggi solo ffmpeg) in modo cross-platform.
//!
//! ## Ordine di risoluzione:
//! 1. Path esplicito da configurazione (`ffmpeg_path`)
//! 2. Variabile d'ambiente `<TOOL>_PATH` (es. `FFMPEG_PATH`)
//! 3. Directory `TOOLS_DIR`, se impostata
//! 4. `PATH` di sistema
//!
//! Nessuno stato globale: il locator è un valore creato da chi ne ha bisogno.

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Locates external binaries
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    tools_dir: Option<PathBuf>,
    search_path: Option<std::ffi::OsString>,
}

impl ToolLocator {
    /// Locator reading `TOOLS_DIR` and `PATH` from the environment
    pub fn from_env() -> Self {
        Self {
            tools_dir: env::var_os("TOOLS_DIR").map(PathBuf::from),
            search_path: env::var_os("PATH"),
        }
    }

    /// Locator with an explicit search path
    pub fn with_search_path(tools_dir: Option<PathBuf>, search_path: impl Into<std::ffi::OsString>) -> Self {
        Self {
            tools_dir,
            search_path: Some(search_path.into()),
        }
    }

    /// Platform-specific executable name
    pub fn executable_name(base_name: &str) -> String {
        if cfg!(windows) {
            format!("{}.exe", base_name)
        } else {
            base_name.to_string()
        }
    }

    /// Resolve a tool, honouring an explicitly configured path first
    pub fn resolve(&self, base_name: &str, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            if path.is_file() {
                debug!("Using configured {}: {:?}", base_name, path);
                return Some(path.to_path_buf());
            }
            warn!("Configured {} not found at {:?}", base_name, path);
        }

        let env_key = format!("{}_PATH", base_name.to_ascii_uppercase());
        if let Some(path) = env::var_os(&env_key).map(PathBuf::from) {
            if path.is_file() {
                debug!("Using {} from {}: {:?}", base_name, env_key, path);
                return Some(path);
            }
        }

        let executable = Self::executable_name(base_name);

        if let Some(dir) = &self.tools_dir {
            let candidate = dir.join(&executable);
            if candidate.is_file() {
                debug!("Using bundled {}: {:?}", base_name, candidate);
                return Some(candidate);
            }
        }

        let found = self
            .search_path
            .as_ref()
            .and_then(|paths| env::split_paths(paths).map(|dir| dir.join(&executable)).find(|p| p.is_file()));

        match &found {
            Some(path) => debug!("Using system {}: {:?}", base_name, path),
            None => debug!("{} not found in PATH", base_name),
        }
        found
    }

    /// Get system information for debugging
    pub fn system_info() -> SystemInfo {
        SystemInfo {
            os: env::consts::OS,
            arch: env::consts::ARCH,
            family: env::consts::FAMILY,
        }
    }
}

/// System information structure
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.os, self.arch, self.family)
    }
}
