//! Resolution of engine-style resource paths.

use std::path::{Path, PathBuf};

const RES_PREFIX: &str = "res://";
const USER_PREFIX: &str = "user://";

/// Maps `res://` to the project directory and `user://` to the user data
/// directory. Other paths are used as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    project_root: PathBuf,
    user_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(project_root: impl Into<PathBuf>, user_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            user_dir: user_dir.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    /// Converts a script path into a filesystem path.
    pub fn globalize(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix(RES_PREFIX) {
            self.project_root.join(rest.trim_start_matches('/'))
        } else if let Some(rest) = path.strip_prefix(USER_PREFIX) {
            self.user_dir.join(rest.trim_start_matches('/'))
        } else {
            PathBuf::from(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globalize() {
        let paths = ProjectPaths::new("/game", "/home/me/.local/share/gdort");
        assert_eq!(paths.globalize("res://models/a.onnx"), PathBuf::from("/game/models/a.onnx"));
        assert_eq!(paths.globalize("res:///a.onnx"), PathBuf::from("/game/a.onnx"));
        assert_eq!(
            paths.globalize("user://cache/b.onnx"),
            PathBuf::from("/home/me/.local/share/gdort/cache/b.onnx")
        );
        assert_eq!(paths.globalize("/abs/c.onnx"), PathBuf::from("/abs/c.onnx"));
        assert_eq!(paths.globalize("rel/d.onnx"), PathBuf::from("rel/d.onnx"));
    }
}
