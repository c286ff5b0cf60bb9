use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a sheet hierarchy.
///
/// All of them are fatal for the whole operation and are raised before any
/// board is touched.
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("Failed to read schematic {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: unbalanced sheet markers ({message})", .path.display())]
    UnbalancedSheets {
        path: PathBuf,
        line: usize,
        message: &'static str,
    },

    #[error("{}:{line}: sheet block has no {field} line", .path.display())]
    MissingField {
        path: PathBuf,
        line: usize,
        field: &'static str,
    },

    #[error("{}:{line}: {message}", .path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Sheet path \"{raw}\" in {} uses undefined variable ${{{name}}}", .path.display())]
    UndefinedVariable {
        path: PathBuf,
        raw: String,
        name: String,
    },

    #[error("Sheet hierarchy contains a cycle: {}", display_chain(.chain))]
    Cycle { chain: Vec<PathBuf> },
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
