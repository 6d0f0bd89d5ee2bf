//! Location arguments: `file:line[:column]`, plain files and line spans

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// A 1-indexed position in a file, as typed on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl ParsedLocation {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("Location cannot be empty");
        }

        // The first ':' followed by a digit starts the position, so paths
        // with a drive letter or colons in directory names still parse
        let split = input
            .char_indices()
            .filter(|&(idx, ch)| ch == ':' && idx > 0)
            .find(|&(idx, _)| {
                input[idx + 1..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit() || c == '-')
            })
            .map(|(idx, _)| idx);
        let Some(split) = split else {
            bail!("Invalid location '{input}'. Expected file:line[:column], e.g. src/main.rs:10:5");
        };

        let mut numbers = input[split + 1..].splitn(2, ':');
        let line = parse_number("line", numbers.next().unwrap_or(""))?;
        let column = match numbers.next() {
            Some(column) => parse_number("column", column)?,
            None => 1,
        };

        Ok(Self {
            file: PathBuf::from(&input[..split]),
            line,
            column,
        })
    }

    /// Same location with the file resolved against `root` and canonicalized
    pub fn resolve(self, root: &Path) -> Result<Self> {
        Ok(Self {
            file: resolve_file(root, &self.file)?,
            ..self
        })
    }
}

impl std::fmt::Display for ParsedLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

fn parse_number(what: &str, text: &str) -> Result<u32> {
    let value: u32 = text
        .parse()
        .with_context(|| format!("Invalid {what} '{text}': expected a positive integer (1-indexed)"))?;
    if value == 0 {
        bail!("{what} must be >= 1 (got 0); positions are 1-indexed");
    }
    Ok(value)
}

/// Absolute, symlink-free path of an existing file
pub fn resolve_file(root: &Path, file: &Path) -> Result<PathBuf> {
    let joined = if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    };
    joined
        .canonicalize()
        .with_context(|| format!("File not found: {}", file.display()))
}

/// Inclusive 1-indexed line span `a:b`; a single number is a one-line span
pub fn parse_line_span(input: &str) -> Result<(u32, u32)> {
    let (first, last) = match input.split_once(':') {
        Some((first, last)) => (parse_number("line", first)?, parse_number("line", last)?),
        None => {
            let line = parse_number("line", input)?;
            (line, line)
        }
    };
    if last < first {
        bail!("Invalid line span '{input}': end is before start");
    }
    Ok((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_location() {
        let loc = ParsedLocation::parse("src/main.rs:10:5").unwrap();
        assert_eq!(loc.file, PathBuf::from("src/main.rs"));
        assert_eq!((loc.line, loc.column), (10, 5));
        assert_eq!(loc.to_string(), "src/main.rs:10:5");
    }

    #[test]
    fn test_parse_without_column() {
        let loc = ParsedLocation::parse("lib/util.go:3").unwrap();
        assert_eq!((loc.line, loc.column), (3, 1));
    }

    #[test]
    fn test_parse_drive_letter() {
        let loc = ParsedLocation::parse("C:\\src\\main.c:7:2").unwrap();
        assert_eq!(loc.file, PathBuf::from("C:\\src\\main.c"));
        assert_eq!((loc.line, loc.column), (7, 2));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(ParsedLocation::parse("").is_err());
        assert!(ParsedLocation::parse("main.rs").is_err());
        assert!(ParsedLocation::parse("main.rs:0:1").is_err());
        assert!(ParsedLocation::parse("main.rs:4:0").is_err());
        let err = ParsedLocation::parse("main.rs:-2").unwrap_err();
        assert!(err.to_string().contains("Invalid line"));
    }

    #[test]
    fn test_resolve_against_root() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();

        let loc = ParsedLocation::parse("a.py:1:1")
            .unwrap()
            .resolve(dir.path())
            .unwrap();
        assert!(loc.file.is_absolute());
        assert!(loc.file.ends_with("a.py"));

        assert!(resolve_file(dir.path(), Path::new("missing.py")).is_err());
    }

    #[test]
    fn test_line_span() {
        assert_eq!(parse_line_span("3:9").unwrap(), (3, 9));
        assert_eq!(parse_line_span("4").unwrap(), (4, 4));
        assert!(parse_line_span("9:3").is_err());
        assert!(parse_line_span("0:3").is_err());
    }
}
