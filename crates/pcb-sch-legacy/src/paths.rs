use std::path::{Component, Path, PathBuf};

use crate::HierarchyError;

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment. The filesystem is not consulted, so symlinks are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = out.has_root() && out.parent().is_none();
                if at_root {
                    continue;
                }
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    _ => false,
                };
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Substitute every `${NAME}` token in `raw` through `env`.
///
/// An unterminated `${` is kept literally.
pub(crate) fn expand_variables(
    raw: &str,
    document: &Path,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<String, HierarchyError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let name = &rest[start + 2..start + 2 + len];
        let value = env(name).ok_or_else(|| HierarchyError::UndefinedVariable {
            path: document.to_path_buf(),
            raw: raw.to_string(),
            name: name.to_string(),
        })?;
        out.push_str(&rest[..start]);
        out.push_str(&value);
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Resolve the `F1` path of a sheet block found in `document`.
///
/// Absolute paths are used as given, `${VAR}` tokens are expanded first and
/// anything still relative is taken relative to the parent document's
/// directory.
pub(crate) fn resolve_sheet_path(
    raw: &str,
    document: &Path,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<PathBuf, HierarchyError> {
    let expanded = expand_variables(&raw.replace('\\', "/"), document, env)?;
    let candidate = PathBuf::from(expanded);

    let resolved = if candidate.is_absolute() {
        candidate
    } else {
        document
            .parent()
            .unwrap_or(Path::new("."))
            .join(candidate)
    };

    Ok(normalize_path(&resolved))
}
