//! Domain entities: base package, filtering rules and extracted references

use std::fmt;
use std::path::PathBuf;

use crate::domain::error::{DomainError, DomainResult};

/// Wildcard suffix of an on-demand import (`import a.b.*;`).
pub const WILDCARD_SUFFIX: &str = ".*";

/// The namespace prefix that scopes which references are intra-project.
///
/// Holds the dotted form (`org.example`) and the slashed form
/// (`org/example`). Both are derived from a single input so they always
/// denote the same package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasePackage {
    dotted: String,
    slashed: String,
}

impl BasePackage {
    /// Parse a base package given in dotted or slashed form.
    pub fn parse(value: &str) -> DomainResult<Self> {
        let trimmed = value.trim().trim_matches('/');
        let invalid = |reason: &str| DomainError::InvalidBasePackage {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("must not be empty"));
        }

        let segments: Vec<&str> = trimmed.split(['.', '/']).collect();
        for segment in &segments {
            if !is_identifier(segment) {
                return Err(invalid(&format!("'{segment}' is not an identifier")));
            }
        }

        Ok(Self {
            dotted: segments.join("."),
            slashed: segments.join("/"),
        })
    }

    pub fn dotted(&self) -> &str {
        &self.dotted
    }

    pub fn slashed(&self) -> &str {
        &self.slashed
    }

    /// Relative filesystem path of the package (`org/example`).
    pub fn as_path(&self) -> PathBuf {
        self.dotted.split('.').collect()
    }

    /// True if `name` is the package itself or lies below it.
    ///
    /// Matching is segment aware: `org.examples.Foo` is not covered by
    /// `org.example`.
    pub fn covers(&self, name: &str) -> bool {
        match name.strip_prefix(&self.dotted) {
            Some("") => true,
            Some(rest) => rest.starts_with('.'),
            None => false,
        }
    }

    /// Strip the package prefix, leaving the dotted remainder.
    ///
    /// Returns `Some("")` for the package itself and `None` for names
    /// outside of it.
    pub fn strip<'a>(&self, name: &'a str) -> Option<&'a str> {
        if !self.covers(name) {
            return None;
        }
        let rest = &name[self.dotted.len()..];
        Some(rest.strip_prefix('.').unwrap_or(rest))
    }
}

impl fmt::Display for BasePackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted)
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Fixed filtering conventions applied while walking a source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRules {
    /// Recognized source file extension, without the dot
    pub source_extension: String,
    /// Directory names never descended into (build output, dependency caches)
    pub ignored_dirs: Vec<String>,
    /// Path segments between a module directory and its package tree
    pub module_convention: Vec<String>,
    /// Leading character marking hidden entries
    pub hidden_marker: char,
}

impl Default for SourceRules {
    fn default() -> Self {
        Self {
            source_extension: "java".into(),
            ignored_dirs: vec![
                "target".into(),
                "build".into(),
                "out".into(),
                "bin".into(),
                "node_modules".into(),
            ],
            module_convention: vec!["src".into(), "main".into(), "java".into()],
            hidden_marker: '.',
        }
    }
}

impl SourceRules {
    pub fn is_hidden(&self, name: &str) -> bool {
        name.starts_with(self.hidden_marker)
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|d| d == name)
    }

    pub fn is_source_file(&self, name: &str) -> bool {
        name.rsplit_once('.')
            .is_some_and(|(stem, ext)| !stem.is_empty() && ext == self.source_extension)
    }

    /// Directory name that triggers the module-root graft (`src`).
    pub fn module_dir_name(&self) -> Option<&str> {
        self.module_convention.first().map(String::as_str)
    }

    /// Logical name of an entry: file stem for sources, the name otherwise.
    pub fn logical_name<'a>(&self, filename: &'a str) -> &'a str {
        if self.is_source_file(filename) {
            let cut = filename.len() - self.source_extension.len() - 1;
            &filename[..cut]
        } else {
            filename
        }
    }

    /// File name a qualified simple name resolves to (`Foo` -> `Foo.java`).
    pub fn source_file_name(&self, simple_name: &str) -> String {
        format!("{}.{}", simple_name, self.source_extension)
    }
}

/// How a reference was found in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `import a.b.C;` (static imports are reduced to their class)
    Import,
    /// `import a.b.*;`
    WildcardImport,
    /// Fully-qualified name at the start of a body line
    QualifiedUsage,
}

/// A qualified name a source file refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Dotted name; wildcard imports keep their trailing `.*`
    pub qualified_name: String,
    pub kind: ReferenceKind,
}

impl Reference {
    pub fn new(qualified_name: impl Into<String>, kind: ReferenceKind) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == ReferenceKind::WildcardImport
    }

    /// The name without a wildcard marker: a package for wildcards,
    /// a type otherwise.
    pub fn target(&self) -> &str {
        self.qualified_name
            .strip_suffix(WILDCARD_SUFFIX)
            .unwrap_or(&self.qualified_name)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn given_dotted_or_slashed_input_when_parsing_then_both_forms_agree() {
        let dotted = BasePackage::parse("org.example.app").unwrap();
        let slashed = BasePackage::parse("org/example/app/").unwrap();

        assert_eq!(dotted, slashed);
        assert_eq!(dotted.dotted(), "org.example.app");
        assert_eq!(dotted.slashed(), "org/example/app");
        assert_eq!(dotted.as_path(), PathBuf::from("org/example/app"));
    }

    #[rstest]
    #[case("")]
    #[case("org..example")]
    #[case(".org")]
    #[case("org.1example")]
    #[case("org.exa-mple")]
    fn given_malformed_package_when_parsing_then_errors(#[case] input: &str) {
        assert!(BasePackage::parse(input).is_err());
    }

    #[rstest]
    #[case("org.example", true)]
    #[case("org.example.pkg.Foo", true)]
    #[case("org.examples.Foo", false)]
    #[case("com.example.Foo", false)]
    #[case("org", false)]
    fn given_name_when_checking_coverage_then_matches_on_segments(
        #[case] name: &str,
        #[case] expected: bool,
    ) {
        let base = BasePackage::parse("org.example").unwrap();
        assert_eq!(base.covers(name), expected);
    }

    #[test]
    fn given_covered_name_when_stripping_then_returns_remainder() {
        let base = BasePackage::parse("org.example").unwrap();
        assert_eq!(base.strip("org.example.pkg.Foo"), Some("pkg.Foo"));
        assert_eq!(base.strip("org.example"), Some(""));
        assert_eq!(base.strip("org.other.Foo"), None);
    }

    #[test]
    fn given_default_rules_when_classifying_names_then_uses_java_conventions() {
        let rules = SourceRules::default();
        assert!(rules.is_source_file("Core.java"));
        assert!(!rules.is_source_file("NotASourceFile.txt"));
        assert!(!rules.is_source_file(".java"));
        assert!(rules.is_hidden(".git"));
        assert!(rules.is_ignored_dir("target"));
        assert_eq!(rules.logical_name("Core.java"), "Core");
        assert_eq!(rules.logical_name("pkg"), "pkg");
        assert_eq!(rules.source_file_name("Core"), "Core.java");
        assert_eq!(rules.module_dir_name(), Some("src"));
    }

    #[test]
    fn given_wildcard_reference_when_asking_target_then_strips_marker() {
        let r = Reference::new("org.example.pkg.*", ReferenceKind::WildcardImport);
        assert!(r.is_wildcard());
        assert_eq!(r.target(), "org.example.pkg");

        let r = Reference::new("org.example.pkg.Foo", ReferenceKind::Import);
        assert!(!r.is_wildcard());
        assert_eq!(r.target(), "org.example.pkg.Foo");
    }
}
