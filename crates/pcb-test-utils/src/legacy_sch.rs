//! Builders for legacy (`EESchema ... Version 4`) schematic documents.
//!
//! ```
//! use pcb_test_utils::legacy_sch::{component_block, document, sheet_block};
//!
//! let top = document(&[
//!     sheet_block("5C000001", "Amp A", "amp.sch"),
//!     component_block("Connector:Conn", "J1", "5F000001", "CONN"),
//! ]);
//! assert!(top.ends_with("$EndSCHEMATC\n"));
//! ```

use std::fmt::Write;

/// A `$Sheet` block instantiating `file` under `name`.
pub fn sheet_block(sheet_id: &str, name: &str, file: &str) -> String {
    format!(
        "$Sheet\nS 2000 1500 1200 800\nU {sheet_id}\n\
         F0 \"{name}\" 50\nF1 \"{file}\" 50\n$EndSheet\n"
    )
}

/// A `$Comp` block without instance annotations.
pub fn component_block(lib: &str, reference: &str, timestamp: &str, value: &str) -> String {
    comp(lib, reference, timestamp, value, None)
}

/// A `$Comp` block carrying an `AR` annotation for the instance at `path`.
pub fn annotated_component_block(
    lib: &str,
    reference: &str,
    timestamp: &str,
    path: &str,
    value: &str,
) -> String {
    comp(lib, reference, timestamp, value, Some(path))
}

fn comp(lib: &str, reference: &str, timestamp: &str, value: &str, path: Option<&str>) -> String {
    let mut out = format!("$Comp\nL {lib} {reference}\nU 1 1 {timestamp}\nP 5000 3000\n");
    if let Some(path) = path {
        let _ = writeln!(out, "AR Path=\"{path}\" Ref=\"{reference}\"  Part=\"1\"");
    }
    let _ = write!(
        out,
        "F 0 \"{reference}\" H 5070 3046 50  0000 L CNN\n\
         F 1 \"{value}\" H 5070 2955 50  0000 L CNN\n$EndComp\n"
    );
    out
}

/// Wrap `blocks` into a complete schematic document.
pub fn document(blocks: &[String]) -> String {
    let mut out = String::from(
        "EESchema Schematic File Version 4\nEELAYER 30 0\nEELAYER END\n\
         $Descr A4 11693 8268\n$EndDescr\n",
    );
    for block in blocks {
        out.push_str(block);
    }
    out.push_str("$EndSCHEMATC\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_line() {
        let plain = component_block("Device:R", "R1", "5E000001", "1k");
        assert!(!plain.contains("AR Path"));

        let annotated =
            annotated_component_block("Device:R", "R1", "5E000001", "/5C000001/5E000001", "1k");
        assert!(annotated.contains("AR Path=\"/5C000001/5E000001\" Ref=\"R1\"  Part=\"1\"\n"));
        assert!(annotated.starts_with("$Comp\nL Device:R R1\nU 1 1 5E000001\n"));
        assert!(annotated.ends_with("$EndComp\n"));
    }
}
