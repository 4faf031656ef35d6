use crate::directive::canonical_flag;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read requirements file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("requirements include cycle at {}", .0.display())]
    IncludeCycle(PathBuf),
    #[error("requirements nested deeper than {max_depth} levels at {}", path.display())]
    NestingTooDeep { path: PathBuf, max_depth: usize },
    #[error("option '{option}' on line {line} of {} requires a value", path.display())]
    MissingOptionValue {
        option: String,
        line: usize,
        path: PathBuf,
    },
}

/// Raw per-line metadata attached to a requirement entry.
pub type ExtraData = BTreeMap<String, Value>;

/// One requirement found in a requirements file, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementEntry {
    pub specifier: String,
    pub line_number: usize,
    #[serde(default)]
    pub extra_data: ExtraData,
}

impl RequirementEntry {
    fn flag(&self, key: &str) -> bool {
        self.extra_data.get(key).and_then(Value::as_bool) == Some(true)
    }

    pub fn is_editable(&self) -> bool {
        self.flag("is_editable")
    }

    pub fn is_constraint(&self) -> bool {
        self.flag("is_constraint")
    }
}

/// Turns the lines of a requirements listing into requirement entries.
pub trait ManifestParser {
    /// Parse `lines` as if they were read from `origin`, where `lines[0]` is
    /// line `first_line` (1-based) of that file. `origin` anchors relative
    /// includes.
    fn parse_lines(
        &self,
        lines: &[String],
        origin: &Path,
        first_line: usize,
    ) -> Result<Vec<RequirementEntry>, ManifestError>;

    fn parse_file(&self, path: &Path) -> Result<Vec<RequirementEntry>, ManifestError> {
        let lines = read_lines(path)?;
        self.parse_lines(&lines, path, 1)
    }
}

pub fn read_lines(path: &Path) -> Result<Vec<String>, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().map(str::to_owned).collect())
}

/// pip-style requirements file parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequirementsParser {
    /// Follow `-r` and `-c` includes.
    pub include_nested: bool,
    pub max_depth: usize,
}

impl Default for RequirementsParser {
    fn default() -> Self {
        Self {
            include_nested: true,
            max_depth: 8,
        }
    }
}

impl ManifestParser for RequirementsParser {
    fn parse_lines(
        &self,
        lines: &[String],
        origin: &Path,
        first_line: usize,
    ) -> Result<Vec<RequirementEntry>, ManifestError> {
        let mut stack = vec![include_key(origin)];
        let mut out = Vec::new();
        self.parse_into(lines, origin, first_line, false, &mut stack, &mut out)?;
        Ok(out)
    }
}

impl RequirementsParser {
    fn parse_into(
        &self,
        lines: &[String],
        origin: &Path,
        first_line: usize,
        constraint: bool,
        stack: &mut Vec<PathBuf>,
        out: &mut Vec<RequirementEntry>,
    ) -> Result<(), ManifestError> {
        for (line_number, raw) in logical_lines(lines, first_line) {
            let line = strip_comment(&raw).trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('-') {
                let (option, value) = split_option(line);
                let Some(value) = value else {
                    debug!(
                        "ignoring option line {line_number} of {}: {line}",
                        origin.display()
                    );
                    continue;
                };
                match option.as_str() {
                    "requirement" | "constraint" => {
                        let nested_constraint = constraint || option == "constraint";
                        self.include(origin, &value, nested_constraint, stack, out)?;
                    }
                    "editable" => {
                        let mut extra = base_extra(origin, line_number, constraint);
                        extra.insert("is_editable".to_owned(), Value::Bool(true));
                        extra.insert("link".to_owned(), Value::String(value.clone()));
                        out.push(RequirementEntry {
                            specifier: egg_name(&value).unwrap_or(&value).to_owned(),
                            line_number,
                            extra_data: extra,
                        });
                    }
                    _ => {
                        debug!(
                            "ignoring option '{option}' on line {line_number} of {}",
                            origin.display()
                        );
                    }
                }
                continue;
            }

            out.push(parse_requirement_line(origin, line_number, line, constraint)?);
        }
        Ok(())
    }

    fn include(
        &self,
        origin: &Path,
        target: &str,
        constraint: bool,
        stack: &mut Vec<PathBuf>,
        out: &mut Vec<RequirementEntry>,
    ) -> Result<(), ManifestError> {
        if !self.include_nested {
            debug!("not following include '{target}' from {}", origin.display());
            return Ok(());
        }
        let path = origin
            .parent()
            .map_or_else(|| PathBuf::from(target), |dir| dir.join(target));
        let key = include_key(&path);
        if stack.contains(&key) {
            return Err(ManifestError::IncludeCycle(path));
        }
        if stack.len() > self.max_depth {
            return Err(ManifestError::NestingTooDeep {
                path,
                max_depth: self.max_depth,
            });
        }

        debug!("following include {}", path.display());
        let lines = read_lines(&path)?;
        stack.push(key);
        let result = self.parse_into(&lines, &path, 1, constraint, stack, out);
        stack.pop();
        result
    }
}

fn include_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Join backslash continuations, keeping the number of the first physical line.
fn logical_lines(lines: &[String], first_line: usize) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    for (idx, raw) in lines.iter().enumerate() {
        let (start, mut buf) = pending
            .take()
            .unwrap_or_else(|| (first_line + idx, String::new()));
        if let Some(head) = raw.strip_suffix('\\') {
            buf.push_str(head);
            pending = Some((start, buf));
        } else {
            buf.push_str(raw);
            out.push((start, buf));
        }
    }
    out.extend(pending);
    out
}

/// A `#` starts a comment at line start or after whitespace.
fn strip_comment(line: &str) -> &str {
    let mut prev_ws = true;
    for (idx, c) in line.char_indices() {
        if c == '#' && prev_ws {
            return &line[..idx];
        }
        prev_ws = c.is_whitespace();
    }
    line
}

/// Split an option line into its canonical name and value, accepting
/// `-r file`, `-rfile`, `--requirement file` and `--requirement=file`.
fn split_option(line: &str) -> (String, Option<String>) {
    let mut tokens = line.split_whitespace();
    let head = tokens.next().unwrap_or_default();
    let next = tokens.next().map(str::to_owned);

    if let Some(long) = head.strip_prefix("--") {
        return match long.split_once('=') {
            Some((name, value)) => (name.to_owned(), Some(value.to_owned())),
            None => (long.to_owned(), next),
        };
    }

    let short = head.trim_start_matches('-');
    let mut chars = short.chars();
    let Some(flag) = chars.next() else {
        return (String::new(), None);
    };
    let attached = chars.as_str();
    let name = canonical_flag(&short[..flag.len_utf8()]).to_owned();
    if attached.is_empty() {
        (name, next)
    } else {
        (name, Some(attached.to_owned()))
    }
}

fn base_extra(origin: &Path, line_number: usize, constraint: bool) -> ExtraData {
    let mut extra = ExtraData::new();
    extra.insert("line_number".to_owned(), Value::from(line_number));
    extra.insert(
        "requirement_file".to_owned(),
        Value::String(origin.display().to_string()),
    );
    if constraint {
        extra.insert("is_constraint".to_owned(), Value::Bool(true));
    }
    extra
}

fn parse_requirement_line(
    origin: &Path,
    line_number: usize,
    line: &str,
    constraint: bool,
) -> Result<RequirementEntry, ManifestError> {
    let mut spec_tokens = Vec::new();
    let mut hashes = Vec::new();
    let mut in_options = false;
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        if !in_options && !token.starts_with('-') {
            spec_tokens.push(token);
            continue;
        }
        in_options = true;
        if let Some(hash) = token.strip_prefix("--hash=") {
            hashes.push(hash.to_owned());
        } else if token == "--hash" {
            let value = tokens.next().ok_or_else(|| ManifestError::MissingOptionValue {
                option: "hash".to_owned(),
                line: line_number,
                path: origin.to_path_buf(),
            })?;
            hashes.push(value.to_owned());
        } else {
            debug!("ignoring per-requirement option '{token}' on line {line_number}");
        }
    }

    let specifier = spec_tokens.join(" ");
    let mut extra = base_extra(origin, line_number, constraint);
    if !hashes.is_empty() {
        extra.insert(
            "hash_options".to_owned(),
            Value::Array(hashes.into_iter().map(Value::String).collect()),
        );
    }

    let link = direct_link(&specifier).map(str::to_owned);
    let specifier = match &link {
        Some(location) if is_location(&specifier) => {
            egg_name(location).unwrap_or(location).to_owned()
        }
        _ => specifier,
    };
    if let Some(link) = link {
        extra.insert("link".to_owned(), Value::String(link));
    }

    Ok(RequirementEntry {
        specifier,
        line_number,
        extra_data: extra,
    })
}

fn is_location(specifier: &str) -> bool {
    (specifier.contains("://") && !specifier.contains('@'))
        || specifier.starts_with('.')
        || specifier.starts_with('/')
}

/// The URL or path a requirement points at, if it is not a plain name.
fn direct_link(specifier: &str) -> Option<&str> {
    if is_location(specifier) {
        return Some(specifier);
    }
    let (_, rest) = specifier.split_once('@')?;
    let link = rest.split(';').next().unwrap_or(rest).trim();
    link.contains("://").then_some(link)
}

/// Project name from a `#egg=<name>` URL fragment.
fn egg_name(location: &str) -> Option<&str> {
    let (_, fragment) = location.split_once('#')?;
    fragment
        .split('&')
        .find_map(|part| part.strip_prefix("egg="))
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_owned).collect()
    }

    fn parse(text: &str) -> Vec<RequirementEntry> {
        RequirementsParser::default()
            .parse_lines(&lines(text), Path::new("requirements.txt"), 1)
            .unwrap()
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let entries = parse("# header\n\nfoo==1.0  # pinned\nbar\n");
        let specs: Vec<_> = entries.iter().map(|e| e.specifier.as_str()).collect();
        assert_eq!(specs, vec!["foo==1.0", "bar"]);
        assert_eq!(entries[0].line_number, 3);
        assert_eq!(entries[1].line_number, 4);
    }

    #[test]
    fn hash_inside_url_is_not_a_comment() {
        let entries = parse("-e git+https://example.com/repo.git#egg=mypkg\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].specifier, "mypkg");
        assert!(entries[0].is_editable());
        assert_eq!(
            entries[0].extra_data["link"],
            "git+https://example.com/repo.git#egg=mypkg"
        );
    }

    #[test]
    fn joins_continuation_lines_and_collects_hashes() {
        let entries = parse(
            "foo==1.0 \\\n    --hash=sha256:aaa \\\n    --hash sha256:bbb\nbar==2.0\n",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].specifier, "foo==1.0");
        assert_eq!(
            entries[0].extra_data["hash_options"],
            serde_json::json!(["sha256:aaa", "sha256:bbb"])
        );
        assert_eq!(entries[1].line_number, 4);
    }

    #[test]
    fn first_line_offsets_line_numbers() {
        let entries = RequirementsParser::default()
            .parse_lines(&lines("foo\nbar"), Path::new("r.txt"), 3)
            .unwrap();
        assert_eq!(entries[0].line_number, 3);
        assert_eq!(entries[1].extra_data["line_number"], 4);
    }

    #[test]
    fn keeps_markers_in_specifier() {
        let entries = parse("pywin32 >= 1.0 ; sys_platform == 'win32'\n");
        assert_eq!(entries[0].specifier, "pywin32 >= 1.0 ; sys_platform == 'win32'");
    }

    #[test]
    fn records_direct_url_link() {
        let entries = parse("pip @ https://github.com/pypa/pip/archive/22.0.zip\n");
        assert_eq!(entries[0].specifier, "pip @ https://github.com/pypa/pip/archive/22.0.zip");
        assert_eq!(
            entries[0].extra_data["link"],
            "https://github.com/pypa/pip/archive/22.0.zip"
        );
    }

    #[test]
    fn ignores_global_options() {
        let entries = parse("foo\n-i https://pypi.example.com/simple\n--no-binary :all:\nbar\n");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn option_without_value_is_ignored() {
        let entries = parse("foo\n-r\n");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn follows_nested_requirement_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.txt"), "six==1.16.0\n").unwrap();
        fs::write(dir.path().join("constraints.txt"), "urllib3<2\n").unwrap();
        fs::write(
            dir.path().join("requirements.txt"),
            "requests\n-r base.txt\n--constraint=constraints.txt\n",
        )
        .unwrap();

        let entries = RequirementsParser::default()
            .parse_file(&dir.path().join("requirements.txt"))
            .unwrap();
        let specs: Vec<_> = entries.iter().map(|e| e.specifier.as_str()).collect();
        assert_eq!(specs, vec!["requests", "six==1.16.0", "urllib3<2"]);
        assert!(!entries[1].is_constraint());
        assert!(entries[2].is_constraint());
        assert!(entries[1].extra_data["requirement_file"]
            .as_str()
            .unwrap()
            .ends_with("base.txt"));
    }

    #[test]
    fn nested_files_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.txt"), "six\n").unwrap();
        fs::write(dir.path().join("requirements.txt"), "foo\n-rbase.txt\n").unwrap();
        let parser = RequirementsParser {
            include_nested: false,
            ..RequirementsParser::default()
        };
        let entries = parser
            .parse_file(&dir.path().join("requirements.txt"))
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn detects_include_cycles() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo\n-r b.txt\n").unwrap();
        fs::write(dir.path().join("b.txt"), "bar\n-r a.txt\n").unwrap();
        let err = RequirementsParser::default()
            .parse_file(&dir.path().join("a.txt"))
            .unwrap_err();
        assert!(matches!(err, ManifestError::IncludeCycle(_)));
    }

    #[test]
    fn limits_nesting_depth() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "-r b.txt\n").unwrap();
        fs::write(dir.path().join("b.txt"), "-r c.txt\n").unwrap();
        fs::write(dir.path().join("c.txt"), "foo\n").unwrap();
        let parser = RequirementsParser {
            include_nested: true,
            max_depth: 1,
        };
        let err = parser.parse_file(&dir.path().join("a.txt")).unwrap_err();
        assert!(matches!(err, ManifestError::NestingTooDeep { max_depth: 1, .. }));
    }

    #[test]
    fn missing_nested_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "-r missing.txt\n").unwrap();
        let err = RequirementsParser::default()
            .parse_file(&dir.path().join("a.txt"))
            .unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }

    #[test]
    fn dangling_hash_option_is_an_error() {
        let err = RequirementsParser::default()
            .parse_lines(&lines("foo==1.0 --hash"), Path::new("r.txt"), 1)
            .unwrap_err();
        assert!(matches!(err, ManifestError::MissingOptionValue { line: 1, .. }));
    }

    #[test]
    fn split_option_forms() {
        let requirement = ("requirement".to_owned(), Some("base.txt".to_owned()));
        assert_eq!(split_option("-r base.txt"), requirement);
        assert_eq!(split_option("-rbase.txt"), requirement);
        assert_eq!(split_option("--requirement=base.txt"), requirement);
        assert_eq!(split_option("--no-index"), ("no-index".to_owned(), None));
        assert_eq!(split_option("-"), (String::new(), None));
    }
}
