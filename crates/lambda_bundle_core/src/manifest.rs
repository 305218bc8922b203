//! Requirements manifest pre-flight.
//!
//! The installer remains the authority on what a requirement means. This
//! parser only catches lines that no installer would accept, so that a typo
//! fails the build before anything is staged.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ManifestLine {
    /// A named distribution, e.g. `requests[socks]>=2.0 ; python_version>"3"`.
    Requirement(Requirement),
    /// A URL, local path or VCS reference handed to the installer unchanged.
    Reference(String),
    /// An installer option line such as `-r base.txt` or `--index-url ...`.
    Option(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub specifier: String,
    pub marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub line_number: usize,
    pub line: ManifestLine,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.iter().filter_map(|entry| match &entry.line {
            ManifestLine::Requirement(requirement) => Some(requirement),
            _ => None,
        })
    }

    /// True when nothing in the manifest would make the installer fetch a package.
    pub fn is_empty(&self) -> bool {
        !self
            .entries
            .iter()
            .any(|entry| !matches!(entry.line, ManifestLine::Option(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestError {
    pub line_number: usize,
    pub message: String,
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.message)
    }
}

impl std::error::Error for ManifestError {}

pub fn parse_manifest(contents: &str) -> Result<Manifest, ManifestError> {
    let mut entries = Vec::new();
    let mut pending = String::new();
    let mut pending_start = 0usize;

    for (index, raw_line) in contents.lines().enumerate() {
        let line_number = index + 1;
        if pending.is_empty() {
            pending_start = line_number;
        }

        if let Some(continued) = raw_line.strip_suffix('\\') {
            pending.push_str(continued);
            pending.push(' ');
            continue;
        }
        pending.push_str(raw_line);

        let logical = std::mem::take(&mut pending);
        if let Some(line) = parse_logical_line(&logical, pending_start)? {
            entries.push(ManifestEntry {
                line_number: pending_start,
                line,
            });
        }
    }

    if !pending.is_empty() {
        if let Some(line) = parse_logical_line(&pending, pending_start)? {
            entries.push(ManifestEntry {
                line_number: pending_start,
                line,
            });
        }
    }

    Ok(Manifest { entries })
}

fn parse_logical_line(
    raw: &str,
    line_number: usize,
) -> Result<Option<ManifestLine>, ManifestError> {
    let line = strip_comment(raw).trim();
    if line.is_empty() {
        return Ok(None);
    }

    if line.starts_with('-') {
        return Ok(Some(ManifestLine::Option(line.to_string())));
    }

    if !is_named_direct_reference(line) && is_reference(line) {
        return Ok(Some(ManifestLine::Reference(line.to_string())));
    }

    parse_requirement(line)
        .map(|requirement| Some(ManifestLine::Requirement(requirement)))
        .map_err(|message| ManifestError {
            line_number,
            message,
        })
}

/// `#` starts a comment at the beginning of a line or after whitespace.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (index, byte) in bytes.iter().enumerate() {
        if *byte == b'#' && (index == 0 || bytes[index - 1].is_ascii_whitespace()) {
            return &line[..index];
        }
    }
    line
}

fn is_reference(line: &str) -> bool {
    line.contains("://")
        || line.starts_with('.')
        || line.starts_with('/')
        || line.starts_with('~')
        || line.starts_with("git+")
        || line.starts_with("hg+")
        || line.starts_with("svn+")
        || line.starts_with("bzr+")
}

/// `name [extras] @ url`, as opposed to a bare URL that happens to contain `@`.
fn is_named_direct_reference(line: &str) -> bool {
    let Some((before, _)) = line.split_once('@') else {
        return false;
    };
    let name = before.split('[').next().unwrap_or_default().trim();
    !name.is_empty() && name.chars().all(is_name_char)
}

fn parse_requirement(line: &str) -> Result<Requirement, String> {
    let (body, marker) = match line.split_once(';') {
        Some((body, marker)) => {
            let marker = marker.trim();
            if marker.is_empty() {
                return Err("environment marker after ';' is empty".to_string());
            }
            (body.trim(), Some(marker.to_string()))
        }
        None => (line, None),
    };

    let name_end = body
        .find(|c: char| !is_name_char(c))
        .unwrap_or(body.len());
    let name = &body[..name_end];
    validate_name(name, line)?;

    let mut rest = body[name_end..].trim_start();
    let mut extras = Vec::new();
    if let Some(after_bracket) = rest.strip_prefix('[') {
        let close = after_bracket
            .find(']')
            .ok_or_else(|| format!("unterminated extras list in '{line}'"))?;
        for extra in after_bracket[..close].split(',') {
            let extra = extra.trim();
            if extra.is_empty() {
                continue;
            }
            validate_name(extra, line)?;
            extras.push(extra.to_string());
        }
        rest = after_bracket[close + 1..].trim_start();
    }

    if rest.starts_with('@') {
        // PEP 508 direct reference: `name @ https://...`
        if rest[1..].trim().is_empty() {
            return Err(format!("direct reference in '{line}' has no URL"));
        }
    } else if !rest.is_empty() {
        validate_specifier(rest, line)?;
    }

    Ok(Requirement {
        name: name.to_string(),
        extras,
        specifier: rest.to_string(),
        marker,
    })
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn validate_name(name: &str, line: &str) -> Result<(), String> {
    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let ends_ok = name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        return Err(format!("'{line}' does not start with a valid distribution name"));
    }
    Ok(())
}

fn validate_specifier(specifier: &str, line: &str) -> Result<(), String> {
    const OPERATORS: [&str; 8] = ["===", "~=", "==", "!=", "<=", ">=", "<", ">"];

    let clauses = specifier
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',');
    for clause in clauses {
        let clause = clause.trim();
        let Some(operator) = OPERATORS.iter().find(|op| clause.starts_with(**op)) else {
            return Err(format!(
                "unrecognised version specifier '{clause}' in '{line}'"
            ));
        };
        let version = clause[operator.len()..].trim();
        if version.is_empty() || version.contains(char::is_whitespace) {
            return Err(format!("missing or malformed version after '{operator}' in '{line}'"));
        }
    }
    Ok(())
}
