//! Line tokenizer for legacy schematic documents.
//!
//! Every line is classified into a [`Record`] before the sheet-block state
//! machine in [`sheet_blocks`] looks at it, so malformed input surfaces as a
//! [`HierarchyError`] carrying the offending line number.

use std::path::Path;

use crate::HierarchyError;

/// One classified line of a legacy schematic document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<'a> {
    /// `$Sheet`
    SheetStart,
    /// `$EndSheet`
    SheetEnd,
    /// Any other `$Directive` (`$Comp`, `$EndComp`, `$Descr`, ...).
    Directive(&'a str),
    /// `U <token> ...`. Inside a sheet block the first token is the sheet id.
    Unit(Vec<&'a str>),
    /// `F<n> "<value>" ...` sheet field line (F0 name, F1 file, F2+ pins).
    SheetField { number: u32, value: String },
    Other,
}

/// A child-sheet reference found in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetBlock {
    pub sheet_id: String,
    pub name: String,
    /// The `F1` path exactly as written in the document.
    pub file: String,
    /// 1-based line of the `$Sheet` marker.
    pub line: usize,
}

/// Classify a single line. `Err` carries a message for a [`HierarchyError::Syntax`].
pub fn tokenize_line(line: &str) -> Result<Record<'_>, String> {
    let trimmed = line.trim();

    if let Some(directive) = trimmed.strip_prefix('$') {
        let name = directive.split_whitespace().next().unwrap_or("");
        return Ok(match name {
            "Sheet" => Record::SheetStart,
            "EndSheet" => Record::SheetEnd,
            _ => Record::Directive(name),
        });
    }

    let mut words = trimmed.splitn(2, char::is_whitespace);
    let keyword = words.next().unwrap_or("");
    let rest = words.next().unwrap_or("").trim_start();

    if keyword == "U" {
        let args: Vec<&str> = rest.split_whitespace().collect();
        if args.is_empty() {
            return Err("U line has no identifier".to_string());
        }
        return Ok(Record::Unit(args));
    }

    if let Some(digits) = keyword.strip_prefix('F') {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            let number = digits
                .parse::<u32>()
                .map_err(|e| format!("invalid field number \"{digits}\": {e}"))?;
            let value = parse_value(rest).ok_or_else(|| format!("F{number} line has no value"))?;
            return Ok(Record::SheetField { number, value });
        }
    }

    Ok(Record::Other)
}

/// Read the first value of a field line, quoted or bare.
fn parse_value(rest: &str) -> Option<String> {
    let Some(quoted) = rest.strip_prefix('"') else {
        return rest.split_whitespace().next().map(str::to_string);
    };

    let mut value = String::new();
    let mut chars = quoted.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => value.push(chars.next()?),
            '"' => return Some(value),
            _ => value.push(ch),
        }
    }

    // Unterminated quote
    None
}

/// Extract every `$Sheet` block of a document.
///
/// `path` is only used for error reporting.
pub fn sheet_blocks(content: &str, path: &Path) -> Result<Vec<SheetBlock>, HierarchyError> {
    struct Open {
        line: usize,
        sheet_id: Option<String>,
        name: Option<String>,
        file: Option<String>,
    }

    let mut blocks = Vec::new();
    let mut open: Option<Open> = None;

    for (idx, line) in content.lines().enumerate() {
        let lineno = idx + 1;
        let record = match tokenize_line(line) {
            Ok(record) => record,
            // Free text (notes, labels) outside sheet blocks is not ours to judge.
            Err(_) if open.is_none() => continue,
            Err(message) => {
                return Err(HierarchyError::Syntax {
                    path: path.to_path_buf(),
                    line: lineno,
                    message,
                });
            }
        };

        let unbalanced = |message| HierarchyError::UnbalancedSheets {
            path: path.to_path_buf(),
            line: lineno,
            message,
        };

        match record {
            Record::SheetStart => {
                if open.is_some() {
                    return Err(unbalanced("$Sheet inside an open sheet block"));
                }
                open = Some(Open {
                    line: lineno,
                    sheet_id: None,
                    name: None,
                    file: None,
                });
            }
            Record::SheetEnd => {
                let Some(block) = open.take() else {
                    return Err(unbalanced("$EndSheet without a matching $Sheet"));
                };
                let missing = |field| HierarchyError::MissingField {
                    path: path.to_path_buf(),
                    line: block.line,
                    field,
                };
                let sheet_id = block.sheet_id.ok_or_else(|| missing("U"))?;
                let file = block.file.ok_or_else(|| missing("F1"))?;
                blocks.push(SheetBlock {
                    sheet_id,
                    name: block.name.unwrap_or_default(),
                    file,
                    line: block.line,
                });
            }
            Record::Unit(args) => {
                if let Some(sheet) = open.as_mut() {
                    sheet.sheet_id = Some(args[0].to_string());
                }
            }
            Record::SheetField { number, value } => {
                if let Some(sheet) = open.as_mut() {
                    match number {
                        0 => sheet.name = Some(value),
                        1 => sheet.file = Some(value),
                        _ => {}
                    }
                }
            }
            Record::Directive(_) | Record::Other => {}
        }
    }

    if let Some(block) = open {
        return Err(HierarchyError::UnbalancedSheets {
            path: path.to_path_buf(),
            line: block.line,
            message: "$Sheet is never closed",
        });
    }

    Ok(blocks)
}
