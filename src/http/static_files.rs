//! Static file serving.
//!
//! # Responsibilities
//! - Map a request path onto a file below the configured root
//! - Reject traversal outside the root, including through symlinks
//! - Serve `index.html` for directories
//!
//! # Design Decisions
//! - Only normal path components are accepted (`..`, roots and drive
//!   prefixes are rejected before touching the filesystem)
//! - Canonicalized result must still start with the canonical root
//! - Missing and rejected paths both answer 404

use std::path::{Component, Path, PathBuf};

use crate::context::{Context, HandlerResult};

/// Files served from one root directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a URL path to a readable file under the root.
    pub fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let mut candidate = self.root.clone();
        for component in Path::new(url_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => candidate.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }

        let root = self.root.canonicalize().ok()?;
        let mut resolved = candidate.canonicalize().ok()?;
        if !resolved.starts_with(&root) {
            tracing::warn!(path = %url_path, "Static path escapes root");
            return None;
        }
        if resolved.is_dir() {
            resolved.push("index.html");
        }
        resolved.is_file().then_some(resolved)
    }

    /// Handler body for the static route; expects a `filepath` parameter.
    pub fn serve(&self, ctx: &mut Context) -> HandlerResult {
        let requested = ctx.param("filepath").unwrap_or("/").to_string();
        match self.resolve(&requested) {
            Some(path) => {
                ctx.file(&path)?;
            }
            None => ctx.abort(404, "File not found"),
        }
        Ok(())
    }
}
