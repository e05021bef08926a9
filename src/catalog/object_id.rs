use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const ROOT_ID: &str = "0";
pub const ROOT_PARENT_ID: &str = "-1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The id is malformed, escapes the root or names nothing on disk.
    #[error("object not found")]
    NotFound,
}

/// Maps object ids to paths below the media root and back.
#[derive(Debug, Clone)]
pub struct ObjectIdResolver {
    root: PathBuf,
}

impl ObjectIdResolver {
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(ObjectIdResolver {
            root: root.as_ref().canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object id to an existing path under the root.
    pub fn to_path(&self, object_id: &str) -> Result<PathBuf, ResolveError> {
        if object_id == ROOT_ID {
            return Ok(self.root.clone());
        }
        let rest = object_id.strip_prefix(ROOT_ID).ok_or(ResolveError::NotFound)?;
        let relative = sanitize_relative(rest)?;
        self.resolve_relative(&relative)
    }

    /// Resolve a `/`-separated path relative to the root, as carried in resource URIs.
    pub fn resolve_relative_path(&self, relative: &str) -> Result<PathBuf, ResolveError> {
        let relative = sanitize_relative(relative)?;
        self.resolve_relative(&relative)
    }

    fn resolve_relative(&self, relative: &Path) -> Result<PathBuf, ResolveError> {
        let joined = self.root.join(relative);
        let resolved = joined.canonicalize().map_err(|_| ResolveError::NotFound)?;
        if !resolved.starts_with(&self.root) {
            return Err(ResolveError::NotFound);
        }
        Ok(resolved)
    }

    /// Map a path under the root to its `(object_id, parent_id)` pair.
    pub fn to_object_id(&self, path: &Path) -> Result<(String, String), ResolveError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| ResolveError::NotFound)?;
        if relative.as_os_str().is_empty() {
            return Ok((ROOT_ID.to_string(), ROOT_PARENT_ID.to_string()));
        }

        let object_id = id_for_relative(relative).ok_or(ResolveError::NotFound)?;
        let parent_id = match relative.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                id_for_relative(parent).ok_or(ResolveError::NotFound)?
            }
            _ => ROOT_ID.to_string(),
        };
        Ok((object_id, parent_id))
    }

    /// Path relative to the root with `/` separators, used in resource URIs.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();
        Some(parts?.join("/"))
    }
}

fn id_for_relative(relative: &Path) -> Option<String> {
    let mut id = String::from(ROOT_ID);
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                id.push('/');
                id.push_str(segment.to_str()?);
            }
            _ => return None,
        }
    }
    Some(id)
}

/// Split on either separator and refuse anything that could climb out of the root.
fn sanitize_relative(rest: &str) -> Result<PathBuf, ResolveError> {
    let mut relative = PathBuf::new();
    for segment in rest.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(ResolveError::NotFound),
            s if s.contains('\0') => return Err(ResolveError::NotFound),
            s => relative.push(s),
        }
    }
    Ok(relative)
}
