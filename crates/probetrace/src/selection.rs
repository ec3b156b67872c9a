//! Line- and field-selection inputs.
//!
//! Line selections are text files of `relative/path/File:N[,N|N-M]*` entries;
//! field selections list `ClassName.fieldName`, one per line.

use crate::ir::FieldRef;
use crate::result::{ProbeError, ProbeResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;

/// Requested source lines per file path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSelection {
    entries: BTreeMap<String, BTreeSet<u32>>,
}

/// Widest `N-M` range a line selection entry may request
pub const MAX_RANGE_SPAN: u32 = 100_000;

fn parse_line_numbers(numbers: &str) -> ProbeResult<BTreeSet<u32>> {
    let mut lines = BTreeSet::new();
    for item in numbers.split(',') {
        let bad = || ProbeError::configuration(format!("invalid line number `{}`", item.trim()));
        if let Some((start, end)) = item.split_once('-') {
            let start: u32 = start.trim().parse().map_err(|_| bad())?;
            let end: u32 = end.trim().parse().map_err(|_| bad())?;
            if end < start || end - start >= MAX_RANGE_SPAN {
                return Err(ProbeError::configuration(format!(
                    "line range `{}` is reversed or spans more than {MAX_RANGE_SPAN} lines",
                    item.trim()
                )));
            }
            lines.extend(start..=end);
        } else {
            lines.insert(item.trim().parse().map_err(|_| bad())?);
        }
    }
    Ok(lines)
}

impl LineSelection {
    /// Parse selection text. Lines that do not split into exactly one path
    /// and one number list are skipped, as are lines with unparseable numbers.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut selection = Self::default();
        for (lineno, raw) in text.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = raw.split(':').collect();
            let [path, numbers] = parts.as_slice() else {
                warn!(line = lineno + 1, entry = raw, "skipping line selection entry without exactly one `:`");
                continue;
            };
            match parse_line_numbers(numbers.trim()) {
                Ok(lines) => selection.insert(path.trim(), lines),
                Err(e) => warn!(line = lineno + 1, entry = raw, error = %e, "skipping line selection entry"),
            }
        }
        selection
    }

    /// Read and parse a selection file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Merge `lines` into the entry for `path`
    pub fn insert(&mut self, path: &str, lines: impl IntoIterator<Item = u32>) {
        self.entries.entry(path.to_string()).or_default().extend(lines);
    }

    /// Lines requested for a class whose source path is `source_path`.
    ///
    /// An entry applies when either path contains the other; all applicable
    /// entries are merged.
    #[must_use]
    pub fn lines_for(&self, source_path: &str) -> BTreeSet<u32> {
        self.entries
            .iter()
            .filter(|(entry, _)| source_path.contains(entry.as_str()) || entry.contains(source_path))
            .flat_map(|(_, lines)| lines.iter().copied())
            .collect()
    }

    /// Requested lines of one entry
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&BTreeSet<u32>> {
        self.entries.get(path)
    }

    /// Number of file entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was requested
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Monitored static fields per class name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    by_class: BTreeMap<String, BTreeSet<String>>,
}

impl FieldSelection {
    /// Parse selection text; each line splits on its first `.`
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut selection = Self::default();
        for raw in text.lines() {
            let entry = raw.trim();
            if entry.is_empty() {
                continue;
            }
            match entry.split_once('.') {
                Some((class, field)) => selection.insert(class, field),
                None => warn!(entry, "skipping field selection entry without `.`"),
            }
        }
        selection
    }

    /// Read a selection file; a missing or unreadable file yields an empty
    /// selection
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "field selection file not found, monitoring no fields");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "field selection file unreadable, monitoring no fields");
                Self::default()
            }
        }
    }

    /// Monitor `class.field`
    pub fn insert(&mut self, class: &str, field: &str) {
        self.by_class
            .entry(class.to_string())
            .or_default()
            .insert(field.to_string());
    }

    /// Whether a read of `field` is monitored. The selection's class name
    /// may be either fully qualified or simple.
    #[must_use]
    pub fn monitors(&self, field: &FieldRef) -> bool {
        [field.class.as_str(), field.class_simple_name()]
            .iter()
            .filter_map(|class| self.by_class.get(*class))
            .any(|fields| fields.contains(&field.name))
    }

    /// Whether no field is monitored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ir::Type;
    use std::io::Write;

    #[test]
    fn test_ranges_expand_and_entries_merge() {
        let selection = LineSelection::parse("src/Foo.java:10,12-14\nsrc/Foo.java: 20 \n");
        let lines: Vec<u32> = selection.get("src/Foo.java").unwrap().iter().copied().collect();
        assert_eq!(lines, vec![10, 12, 13, 14, 20]);
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let selection = LineSelection::parse("no-colon\nA.java:1:2\nB.java:x\nC.java:3\n\n");
        assert_eq!(selection.len(), 1);
        assert!(selection.get("C.java").is_some());
    }

    #[test]
    fn test_oversized_and_reversed_ranges_are_skipped() {
        let selection =
            LineSelection::parse("Huge.java:1-4000000000\nBack.java:9-3\nOk.java:5,1-3\n");
        assert_eq!(selection.len(), 1);
        assert!(selection.get("Huge.java").is_none());
        assert!(selection.get("Back.java").is_none());
        assert_eq!(selection.get("Ok.java").unwrap().len(), 4);
        assert!(parse_line_numbers(&format!("1-{MAX_RANGE_SPAN}")).is_ok());
        assert!(parse_line_numbers(&format!("0-{MAX_RANGE_SPAN}")).is_err());
    }

    #[test]
    fn test_containment_matching() {
        let selection = LineSelection::parse("com/acme/Foo.java:5\nsrc/main/java/com/acme/Foo.java:7\nBar.java:9");
        let lines: Vec<u32> = selection.lines_for("com/acme/Foo.java").into_iter().collect();
        assert_eq!(lines, vec![5, 7]);
        assert!(selection.lines_for("com/acme/Baz.java").is_empty());
    }

    #[test]
    fn test_load_line_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Foo.java:10,12-14").unwrap();
        let selection = LineSelection::load(file.path()).unwrap();
        assert_eq!(selection.lines_for("Foo.java").len(), 4);
    }

    #[test]
    fn test_load_missing_line_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LineSelection::load(&dir.path().join("lines.txt")).is_err());
    }

    #[test]
    fn test_fields_split_on_first_dot() {
        let selection = FieldSelection::parse("Foo.count\n  Foo.total  \nBar.a.b\nnodot\n");
        assert!(selection.monitors(&FieldRef::new("com.acme.Foo", "count", Type::Int)));
        assert!(selection.monitors(&FieldRef::new("Foo", "total", Type::Int)));
        assert!(!selection.monitors(&FieldRef::new("Foo", "other", Type::Int)));
        assert!(selection.monitors(&FieldRef::new("Bar", "a.b", Type::Int)));
    }

    #[test]
    fn test_missing_field_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let selection = FieldSelection::load(&dir.path().join("fields.txt"));
        assert!(selection.is_empty());
    }
}
