//! Lexical dependency extraction.
//!
//! The extractor is line oriented and deliberately not a parser: comments
//! are stripped textually, the import region is read until the first line
//! that is neither blank, `package` nor `import`, and the remaining body is
//! searched for fully-qualified names at the start of a line.

use itertools::Itertools;
use regex::Regex;
use tracing::trace;

use crate::domain::entities::{BasePackage, Reference, ReferenceKind, WILDCARD_SUFFIX};

const TEXT_BLOCK_DELIMITER: &str = "\"\"\"";

/// Scanner position while walking the comment-free lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Between the top of the file and the first declaration line
    ImportRegion,
    /// Ordinary code after the import region
    Body,
    /// Inside a `"""` text block
    TextBlock,
}

/// Extracts intra-project references from source text.
pub struct DependencyExtractor {
    base: BasePackage,
    import_regex: Regex,
    usage_regex: Regex,
    keyword_regex: Regex,
}

impl DependencyExtractor {
    pub fn new(base: BasePackage) -> Self {
        Self {
            base,
            import_regex: Regex::new(
                r"^import\s+(static\s+)?([\p{L}_$][\p{L}\p{N}_$]*(?:\.[\p{L}_$][\p{L}\p{N}_$]*)*)(\.\*)?\s*;\s*$",
            )
            .unwrap(),
            usage_regex: Regex::new(
                r"^[\p{L}_$][\p{L}\p{N}_$]*(?:\.[\p{L}_$][\p{L}\p{N}_$]*)+",
            )
            .unwrap(),
            keyword_regex: Regex::new(r"^(import|package)\b").unwrap(),
        }
    }

    /// All references under the base package, in order of first appearance.
    pub fn extract(&self, source: &str) -> Vec<Reference> {
        let cleaned = strip_comments(source);
        let lines: Vec<&str> = cleaned.lines().collect();

        let (imports, body_start) = self.extract_imports(&lines);
        let usages = self.extract_usages(&lines[body_start..]);

        imports
            .into_iter()
            .chain(usages)
            .unique_by(|r| r.qualified_name.clone())
            .collect()
    }

    /// Import pass over comment-free lines.
    ///
    /// Returns the deduplicated imports and the index of the first line
    /// after the import region.
    pub fn extract_imports(&self, lines: &[&str]) -> (Vec<Reference>, usize) {
        let mut state = ScanState::ImportRegion;
        let mut imports = Vec::new();
        let mut end = lines.len();

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !self.keyword_regex.is_match(trimmed) {
                state = ScanState::Body;
                end = i;
                break;
            }
            // `package a.b; import a.b.C; import a.b.D;` may share one line
            imports.extend(statements(trimmed).filter_map(|statement| self.parse_import(statement)));
        }
        trace!("import region ends at line {} ({:?})", end, state);

        (imports.into_iter().unique().collect(), end)
    }

    /// Qualified-usage pass over the lines after the import region.
    pub fn extract_usages(&self, lines: &[&str]) -> Vec<Reference> {
        let mut state = ScanState::Body;
        let mut usages = Vec::new();

        for line in lines {
            let trimmed = line.trim();

            if state == ScanState::TextBlock {
                if trimmed.matches(TEXT_BLOCK_DELIMITER).count() % 2 == 1 {
                    state = ScanState::Body;
                }
                continue;
            }

            if !trimmed.is_empty() && !self.keyword_regex.is_match(trimmed) {
                if let Some(reference) = self.parse_usage(trimmed) {
                    usages.push(reference);
                }
            }

            if trimmed.matches(TEXT_BLOCK_DELIMITER).count() % 2 == 1 {
                state = ScanState::TextBlock;
            }
        }

        usages.into_iter().unique().collect()
    }

    fn parse_import(&self, line: &str) -> Option<Reference> {
        let caps = self.import_regex.captures(line)?;
        let name = caps.get(2)?.as_str();
        let is_static = caps.get(1).is_some();
        let is_wildcard = caps.get(3).is_some();

        let reference = match (is_static, is_wildcard) {
            // `import static a.b.C.*;` pulls members of class a.b.C
            (true, true) => Reference::new(name, ReferenceKind::Import),
            // `import static a.b.C.member;`
            (true, false) => {
                let (class, _member) = name.rsplit_once('.')?;
                Reference::new(class, ReferenceKind::Import)
            }
            (false, true) => Reference::new(
                format!("{name}{WILDCARD_SUFFIX}"),
                ReferenceKind::WildcardImport,
            ),
            (false, false) => Reference::new(name, ReferenceKind::Import),
        };

        self.base.covers(reference.target()).then_some(reference)
    }

    fn parse_usage(&self, line: &str) -> Option<Reference> {
        let m = self.usage_regex.find(line)?;
        // `a.b.` or `a.b*`: partial match, not a name
        if matches!(line[m.end()..].chars().next(), Some('.') | Some('*')) {
            return None;
        }
        let name = type_prefix(m.as_str());
        if !self.base.covers(name) || name == self.base.dotted() {
            return None;
        }
        Some(Reference::new(name, ReferenceKind::QualifiedUsage))
    }
}

/// `;`-terminated statements of a line; an unterminated tail is dropped.
fn statements(line: &str) -> impl Iterator<Item = &str> {
    line.split_inclusive(';')
        .filter(|piece| piece.ends_with(';'))
        .map(str::trim)
}

/// Cut a dotted name after its first capitalized segment, so member
/// access (`a.b.Util.helper`) refers to the type `a.b.Util`.
fn type_prefix(name: &str) -> &str {
    let mut end = 0;
    for segment in name.split('.') {
        end += segment.len();
        if segment.chars().next().is_some_and(char::is_uppercase) {
            return &name[..end];
        }
        end += 1;
    }
    name
}

/// Remove `/* ... */` and `// ...` comments, keeping line structure.
///
/// String literals are not tracked, so comment delimiters inside strings
/// also start a comment.
pub fn strip_comments(source: &str) -> String {
    let mut in_block = false;
    let mut out = String::with_capacity(source.len());

    for line in source.lines() {
        let mut rest = line;
        loop {
            if in_block {
                match rest.find("*/") {
                    Some(pos) => {
                        rest = &rest[pos + 2..];
                        in_block = false;
                    }
                    None => break,
                }
            } else {
                let line_comment = rest.find("//");
                let block_comment = rest.find("/*");
                match (line_comment, block_comment) {
                    (Some(l), Some(b)) if l < b => {
                        out.push_str(&rest[..l]);
                        break;
                    }
                    (Some(l), None) => {
                        out.push_str(&rest[..l]);
                        break;
                    }
                    (_, Some(b)) => {
                        out.push_str(&rest[..b]);
                        out.push(' ');
                        rest = &rest[b + 2..];
                        in_block = true;
                    }
                    (None, None) => {
                        out.push_str(rest);
                        break;
                    }
                }
            }
        }
        out.push('\n');
    }
    out
}
