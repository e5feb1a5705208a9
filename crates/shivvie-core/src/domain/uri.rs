//! Module reference grammar.
//!
//! A module reference is a single string `[<backend>:]<locator>`. Parsing is
//! pure: nothing touches the filesystem or network until the resolver
//! materialises the parsed [`ModuleUri`].
//!
//! | Backend token | Locator grammar                          | Example                    |
//! |---------------|------------------------------------------|----------------------------|
//! | *(none)*/`file` | filesystem path                        | `./modules/rust-lib`       |
//! | `gh`          | `<scope>/<name>[#<ref>][/<subpath>]*`    | `gh:acme/kits#v2/rust/lib` |
//! | `npm`         | `<name>` or `@<scope>/<name>`            | `npm:@acme/shivvie-lib`    |

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::DomainError;

static URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?P<backend>\w+):)?(?P<locator>[^:]+)$").unwrap());

static GIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<scope>[^/#]+)/(?P<name>[^/#]+)(?:#(?P<ref>[^#/]+))?(?P<subpath>(?:/[^/]+)+/?)?$",
    )
    .unwrap()
});

static REGISTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[^@/]+|@[^@/]+/[^@/]+)$").unwrap());

/// A parsed module reference. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleUri {
    raw: String,
    backend: Backend,
}

/// Where a module lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Local filesystem path (the default when no backend token is given).
    File(PathBuf),
    /// Git-hosted repository.
    Git(GitLocator),
    /// Package registry.
    Registry(RegistryLocator),
}

/// `<scope>/<name>[#<ref>][/<subpath>]*`
///
/// `reference` and `subpath` are empty strings when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLocator {
    pub scope: String,
    pub name: String,
    pub reference: String,
    pub subpath: String,
}

impl GitLocator {
    pub fn parse(locator: &str) -> Option<Self> {
        let caps = GIT_RE.captures(locator)?;
        let group = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        Some(Self {
            scope: group("scope"),
            name: group("name"),
            reference: group("ref"),
            subpath: group("subpath"),
        })
    }

    /// Branch, tag, or commit, if one was pinned.
    pub fn reference(&self) -> Option<&str> {
        (!self.reference.is_empty()).then_some(self.reference.as_str())
    }

    /// Subpath relative to the repository root, without the leading slash.
    pub fn relative_subpath(&self) -> &str {
        self.subpath.trim_matches('/')
    }

    /// `scope/name` as understood by the fetcher.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.scope, self.name)
    }
}

impl fmt::Display for GitLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)?;
        if let Some(reference) = self.reference() {
            write!(f, "#{reference}")?;
        }
        write!(f, "{}", self.subpath)
    }
}

/// A package name, optionally scoped (`@scope/name`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLocator {
    pub name: String,
}

impl RegistryLocator {
    pub fn parse(locator: &str) -> Option<Self> {
        REGISTRY_RE.is_match(locator).then(|| Self {
            name: locator.to_string(),
        })
    }
}

impl ModuleUri {
    /// Parse a module reference.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidUri`] when the string does not match the
    /// top-level grammar, names an unknown backend, or the locator does not
    /// match its backend's sub-grammar.
    pub fn parse(uri: &str) -> Result<Self, DomainError> {
        let invalid = |reason: String| DomainError::InvalidUri {
            uri: uri.to_string(),
            reason,
        };

        let caps = URI_RE
            .captures(uri)
            .ok_or_else(|| invalid("expected [backend:]locator".into()))?;
        let locator = &caps["locator"];

        let backend = match caps.name("backend").map(|m| m.as_str()) {
            None | Some("file") => Backend::File(PathBuf::from(locator)),
            Some("gh") => Backend::Git(GitLocator::parse(locator).ok_or_else(|| {
                invalid(format!(
                    "'{locator}' is not <scope>/<name>[#<ref>][/<subpath>]"
                ))
            })?),
            Some("npm") => Backend::Registry(RegistryLocator::parse(locator).ok_or_else(
                || invalid(format!("'{locator}' is not a package name")),
            )?),
            Some(other) => return Err(invalid(format!("unknown backend '{other}'"))),
        };

        Ok(Self {
            raw: uri.to_string(),
            backend,
        })
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ModuleUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
