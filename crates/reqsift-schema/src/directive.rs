//! Splitting a requirements listing into global directives and requirement lines.
//!
//! Directive scanning only looks at the leading block of lines that start with
//! a dash. The first line that does not start with a dash ends the scan; it and
//! everything after it is returned verbatim as the [`ReducedManifest`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Short directive flags and their canonical long-form names.
pub const SHORT_FLAG_ALIASES: &[(&str, &str)] = &[
    ("i", "index-url"),
    ("c", "constraint"),
    ("r", "requirement"),
    ("e", "editable"),
    ("f", "find-links"),
];

/// Translate a short alias to its canonical long name. Unknown flags pass through.
pub fn canonical_flag(flag: &str) -> &str {
    SHORT_FLAG_ALIASES
        .iter()
        .find(|(short, _)| *short == flag)
        .map_or(flag, |(_, long)| long)
}

/// Global options collected from the leading directive lines of a manifest.
///
/// Keys are canonical long-form flag names. A directive line without a flag
/// token is kept under the unnamed key, which serializes as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<String, Vec<String>>",
    from = "BTreeMap<String, Vec<String>>"
)]
pub struct DirectiveTable {
    entries: BTreeMap<Option<String>, Vec<String>>,
}

impl DirectiveTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `args` under `flag`, creating the entry on first use.
    pub fn record<I, S>(&mut self, flag: Option<&str>, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = flag.map(|f| canonical_flag(f).to_owned());
        self.entries
            .entry(key)
            .or_default()
            .extend(args.into_iter().map(Into::into));
    }

    pub fn get(&self, flag: &str) -> Option<&[String]> {
        self.entries
            .get(&Some(flag.to_owned()))
            .map(Vec::as_slice)
    }

    /// Arguments recorded for directive lines that carried no flag.
    pub fn unnamed(&self) -> Option<&[String]> {
        self.entries.get(&None).map(Vec::as_slice)
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.get(flag).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate in key order; the unnamed entry, if any, comes first.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_deref(), v.as_slice()))
    }
}

impl From<DirectiveTable> for BTreeMap<String, Vec<String>> {
    fn from(table: DirectiveTable) -> Self {
        table
            .entries
            .into_iter()
            .map(|(k, v)| (k.unwrap_or_default(), v))
            .collect()
    }
}

impl From<BTreeMap<String, Vec<String>>> for DirectiveTable {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        let entries = map
            .into_iter()
            .map(|(k, v)| ((!k.is_empty()).then_some(k), v))
            .collect();
        Self { entries }
    }
}

/// The requirement lines of a manifest, starting at the first non-directive line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducedManifest {
    /// Zero-based index of the first kept line in the original manifest.
    pub start: usize,
    pub lines: Vec<String>,
}

impl ReducedManifest {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn to_text(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

fn is_directive_line(line: &str) -> bool {
    line.starts_with('-')
}

/// Extract the flag token and its arguments from a single directive line.
///
/// The short form (`-x a b`) takes every remaining token as an argument. The
/// long form (`--xx a b`) only takes the second token; this asymmetry is what
/// existing manifests rely on and is kept as is.
pub fn parse_directive_line(line: &str) -> (Option<&str>, Vec<&str>) {
    if let Some(rest) = line.strip_prefix("--") {
        let mut tokens = rest.split_whitespace();
        let flag = tokens.next();
        (flag, tokens.next().into_iter().collect())
    } else if let Some(rest) = line.strip_prefix('-') {
        let mut tokens = rest.split_whitespace();
        let flag = tokens.next();
        (flag, tokens.collect())
    } else {
        (None, Vec::new())
    }
}

/// Split manifest lines into the directive table and the reduced manifest.
pub fn split_directives<S: AsRef<str>>(lines: &[S]) -> (DirectiveTable, ReducedManifest) {
    let mut table = DirectiveTable::new();
    let start = lines
        .iter()
        .position(|line| !is_directive_line(line.as_ref()))
        .unwrap_or(lines.len());

    for line in &lines[..start] {
        let (flag, args) = parse_directive_line(line.as_ref());
        table.record(flag, args);
    }

    let reduced = ReducedManifest {
        start,
        lines: lines[start..]
            .iter()
            .map(|l| l.as_ref().to_owned())
            .collect(),
    };
    (table, reduced)
}

/// Same as [`split_directives`] on the lines of `text`.
pub fn split_directives_str(text: &str) -> (DirectiveTable, ReducedManifest) {
    let lines: Vec<&str> = text.lines().collect();
    split_directives(&lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_short_alias_and_stops_at_first_requirement() {
        let (table, reduced) =
            split_directives(&["-i https://x", "--extra-index-url y", "foo==1.0"]);
        assert_eq!(table.get("index-url"), Some(&["https://x".to_owned()][..]));
        assert_eq!(table.get("extra-index-url"), Some(&["y".to_owned()][..]));
        assert_eq!(reduced.lines(), ["foo==1.0"]);
        assert_eq!(reduced.start, 2);
    }

    #[test]
    fn repeated_directives_accumulate() {
        let (table, reduced) = split_directives(&["-c a.txt", "-c b.txt", "foo"]);
        assert_eq!(
            table.get("constraint").unwrap(),
            ["a.txt".to_owned(), "b.txt".to_owned()]
        );
        assert_eq!(table.len(), 1);
        assert_eq!(reduced.lines(), ["foo"]);
    }

    #[test]
    fn later_directives_stay_in_reduced_manifest() {
        let (table, reduced) = split_directives(&["foo==1.0", "-c later.txt"]);
        assert!(table.is_empty());
        assert_eq!(reduced.lines(), ["foo==1.0", "-c later.txt"]);
        assert_eq!(reduced.start, 0);
    }

    #[test]
    fn empty_manifest_yields_empty_outputs() {
        let (table, reduced) = split_directives::<&str>(&[]);
        assert!(table.is_empty());
        assert!(reduced.is_empty());
    }

    #[test]
    fn all_directive_manifest_has_empty_reduced_manifest() {
        let (table, reduced) = split_directives(&["-i https://x", "-f ./wheels"]);
        assert_eq!(table.len(), 2);
        assert!(reduced.is_empty());
        assert_eq!(reduced.start, 2);
    }

    // Pinned behavior: short form keeps every remaining token.
    #[test]
    fn short_form_takes_all_remaining_tokens() {
        let (table, _) = split_directives(&["-f ./a ./b ./c", "x"]);
        assert_eq!(table.get("find-links").unwrap(), ["./a", "./b", "./c"]);
    }

    // Pinned behavior: long form keeps only the second token.
    #[test]
    fn long_form_takes_only_second_token() {
        let (table, _) = split_directives(&["--find-links ./a ./b", "--no-index", "x"]);
        assert_eq!(table.get("find-links").unwrap(), ["./a"]);
        assert_eq!(table.get("no-index"), Some(&[][..]));
    }

    #[test]
    fn flagless_directive_lines_accumulate_under_unnamed_key() {
        let (table, reduced) = split_directives(&["-", "--", "-   ", "bar"]);
        assert_eq!(table.unnamed(), Some(&[][..]));
        assert_eq!(table.len(), 1);
        assert_eq!(reduced.lines(), ["bar"]);
    }

    // Arguments are flattened per key, so the line count is not kept.
    #[test]
    fn flattening_drops_occurrence_boundaries() {
        let (once, _) = split_directives(&["-", "x"]);
        let (thrice, _) = split_directives(&["-", "-", "--", "x"]);
        assert_eq!(once, thrice);

        let (split_late, _) = split_directives(&["-f a b", "-f c", "x"]);
        let (split_early, _) = split_directives(&["-f a", "-f b c", "x"]);
        assert_eq!(split_late, split_early);
        assert_eq!(split_late.get("find-links").unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn unknown_short_flags_pass_through() {
        let (table, _) = split_directives(&["-x value", "-e ./pkg"]);
        assert_eq!(table.get("x").unwrap(), ["value"]);
        assert_eq!(table.get("editable").unwrap(), ["./pkg"]);
    }

    #[test]
    fn long_and_short_forms_share_canonical_key() {
        let (table, _) = split_directives(&[
            "-r base.txt",
            "--requirement extra.txt ignored",
            "pkg",
        ]);
        assert_eq!(table.get("requirement").unwrap(), ["base.txt", "extra.txt"]);
    }

    #[test]
    fn comment_line_ends_directive_block() {
        let (table, reduced) = split_directives_str("-i https://x\n# deps\n-c c.txt\nfoo\n");
        assert_eq!(table.len(), 1);
        assert_eq!(reduced.lines(), ["# deps", "-c c.txt", "foo"]);
        assert_eq!(reduced.to_text(), "# deps\n-c c.txt\nfoo\n");
    }

    #[test]
    fn serializes_unnamed_key_as_empty_string() {
        let (table, _) = split_directives(&["-", "-i https://x"]);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"":[],"index-url":["https://x"]}"#);
        let back: DirectiveTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn iterates_unnamed_first() {
        let (table, _) = split_directives(&["-i a", "-"]);
        let keys: Vec<_> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![None, Some("index-url")]);
    }
}
