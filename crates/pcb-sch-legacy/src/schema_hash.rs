//! Reference-independent content hash of schematic pages.
//!
//! A saved layout may only be restored onto a sub-circuit whose schematic is
//! the same as the one it was captured from. Renumbering references or
//! re-annotating must not break that check, so every line carrying a
//! reference designator, a timestamp or a library reference is dropped before
//! hashing.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::HierarchyError;

/// Line prefixes (after leading whitespace) excluded from the hash.
///
/// * `F 0 ` – component reference field
/// * `L `   – library reference (also carries the reference)
/// * `AR `  – per-instance alternate references
/// * `U `   – component unit/timestamp and sheet timestamp
const VOLATILE_PREFIXES: &[&str] = &["F 0 ", "L ", "AR ", "U "];

/// Drop reference, timestamp and library-reference lines from a document.
pub fn strip_volatile_lines(content: &str) -> String {
    content
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !VOLATILE_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// MD5 (lowercase hex) over the stripped content of every distinct file.
///
/// Stripped documents are sorted before hashing so the result does not depend
/// on where the project lives on disk or in which order files were listed.
pub fn schema_hash<P: AsRef<Path>>(
    files: impl IntoIterator<Item = P>,
) -> Result<String, HierarchyError> {
    let unique: BTreeSet<PathBuf> = files
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();

    let mut stripped = Vec::with_capacity(unique.len());
    for path in &unique {
        let content = fs::read_to_string(path).map_err(|source| HierarchyError::Read {
            path: path.clone(),
            source,
        })?;
        stripped.push(strip_volatile_lines(&content));
    }
    stripped.sort();

    let mut context = md5::Context::new();
    for document in &stripped {
        context.consume(document.as_bytes());
        context.consume(b"\n");
    }
    Ok(format!("{:x}", context.compute()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AMP: &str = "EESchema Schematic File Version 4
$Comp
L Device:R R5
U 1 1 5C6A2000
P 5000 3000
AR Path=\"/5C6A1C15/5C6A2000\" Ref=\"R5\"  Part=\"1\"
F 0 \"R5\" H 5070 3046 50  0000 L CNN
F 1 \"10k\" H 5070 2955 50  0000 L CNN
    1    5000 3000
$EndComp
$EndSCHEMATC";

    #[test]
    fn test_strip_volatile_lines() {
        insta::assert_snapshot!(strip_volatile_lines(AMP), @r#"
        EESchema Schematic File Version 4
        $Comp
        P 5000 3000
        F 1 "10k" H 5070 2955 50  0000 L CNN
            1    5000 3000
        $EndComp
        $EndSCHEMATC
        "#);
    }

    #[test]
    fn test_hash_ignores_reference_renumbering() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.sch");
        let renamed = dir.path().join("b.sch");
        std::fs::write(&original, AMP).unwrap();
        std::fs::write(&renamed, AMP.replace("R5", "R15")).unwrap();

        assert_eq!(
            schema_hash([&original]).unwrap(),
            schema_hash([&renamed]).unwrap()
        );
    }

    #[test]
    fn test_hash_sees_value_change() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.sch");
        let changed = dir.path().join("b.sch");
        std::fs::write(&original, AMP).unwrap();
        std::fs::write(&changed, AMP.replace("10k", "22k")).unwrap();

        assert_ne!(
            schema_hash([&original]).unwrap(),
            schema_hash([&changed]).unwrap()
        );
    }

    #[test]
    fn test_hash_ignores_order_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.sch");
        let b = dir.path().join("b.sch");
        std::fs::write(&a, AMP).unwrap();
        std::fs::write(&b, "EESchema Schematic File Version 4\n$EndSCHEMATC").unwrap();

        let forward = schema_hash([&a, &b]).unwrap();
        let backward = schema_hash([&b, &a, &b]).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 32);
    }

    #[test]
    fn test_hash_missing_file() {
        let err = schema_hash([Path::new("/definitely/not/here.sch")]).unwrap_err();
        assert!(matches!(err, HierarchyError::Read { .. }));
    }
}
