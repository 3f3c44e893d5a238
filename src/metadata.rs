//! Descriptive metadata attached to modules.
use linked_hash_map::LinkedHashMap;
use modgen_ir::{Attr, Attributes};
use modgen_utils::{Error, Id, ModgenResult, SourceLoc};
use std::path::Path;
use std::process::Command;

/// Keys of the metadata operation that are populated from the named fields.
const RESERVED_KEYS: [&str; 7] = [
    "symbolRef",
    "name",
    "repo",
    "commitHash",
    "commit_hash",
    "version",
    "summary",
];

/// Metadata of a module. Unset fields are filled in when the module op is
/// created: the name defaults to the module name and the summary to the
/// declaration's doc text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    pub name: Option<String>,
    pub repo: Option<String>,
    pub commit_hash: Option<String>,
    pub version: Option<String>,
    pub summary: Option<String>,
    /// Any other entries.
    pub misc: LinkedHashMap<Id, Attr>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name<S: ToString>(mut self, name: S) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn repo<S: ToString>(mut self, repo: S) -> Self {
        self.repo = Some(repo.to_string());
        self
    }

    pub fn commit_hash<S: ToString>(mut self, hash: S) -> Self {
        self.commit_hash = Some(hash.to_string());
        self
    }

    pub fn version<S: ToString>(mut self, version: S) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn summary<S: ToString>(mut self, summary: S) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn misc<K: Into<Id>, V: Into<Attr>>(mut self, key: K, val: V) -> Self {
        self.misc.insert(key.into(), val.into());
        self
    }

    /// Check that no miscellaneous entry shadows a named field.
    pub(crate) fn validate(&self) -> ModgenResult<()> {
        let shadowed = self
            .misc
            .keys()
            .filter(|k| RESERVED_KEYS.contains(&k.as_str()))
            .map(|k| k.as_str())
            .collect::<Vec<_>>();
        if shadowed.is_empty() {
            Ok(())
        } else {
            Err(Error::declaration(format!(
                "Metadata entries shadow named fields: {}",
                shadowed.join(", ")
            )))
        }
    }

    /// Fill in missing repository information from the git repository
    /// containing the file at `loc`, if neither the repository nor the commit
    /// was given. Failures are ignored.
    pub(crate) fn fill_provenance(&mut self, loc: SourceLoc) {
        if self.repo.is_some() || self.commit_hash.is_some() {
            return;
        }
        let dir = source_dir(loc);
        let repo = git(dir, &["remote", "get-url", "origin"]);
        match (repo, git(dir, &["rev-parse", "HEAD"])) {
            (Some(repo), Some(hash)) => {
                self.repo = Some(repo);
                self.commit_hash = Some(hash);
            }
            _ => log::debug!("No git provenance available for metadata"),
        }
    }

    /// Attributes of the metadata operation, named fields first.
    pub(crate) fn to_attributes(&self) -> Attributes {
        let named = [
            ("name", &self.name),
            ("repo", &self.repo),
            ("commitHash", &self.commit_hash),
            ("version", &self.version),
            ("summary", &self.summary),
        ];
        named
            .into_iter()
            .filter_map(|(k, v)| {
                v.as_ref().map(|v| (Id::new(k), Attr::Str(v.clone())))
            })
            .chain(self.misc.iter().map(|(k, v)| (*k, v.clone())))
            .collect()
    }
}

/// Directory of the file at `loc`, if it can be found from here.
fn source_dir(loc: SourceLoc) -> Option<&'static Path> {
    Path::new(loc.file())
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty() && dir.is_dir())
}

/// Run git in `dir`, or in the working directory if there is none, and
/// return its trimmed output.
fn git(dir: Option<&Path>, args: &[&str]) -> Option<String> {
    let mut cmd = Command::new("git");
    if let Some(dir) = dir {
        cmd.arg("-C").arg(dir);
    }
    let out = match cmd.args(args).output() {
        Ok(out) => out,
        Err(e) => {
            log::debug!("Failed to run git: {e}");
            return None;
        }
    };
    if !out.status.success() {
        log::debug!("git {} exited with {}", args.join(" "), out.status);
        return None;
    }
    let text = String::from_utf8(out.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::{source_dir, Metadata};
    use modgen_ir::Attr;
    use modgen_utils::{ErrorKind, SourceLoc};

    #[test]
    fn misc_cannot_shadow_fields() {
        let meta = Metadata::new().misc("version", "2");
        let err = meta.validate().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Declaration(_)));
        assert!(Metadata::new().misc("owner", "hw").validate().is_ok());
    }

    #[test]
    fn attributes_skip_unset_fields() {
        let meta = Metadata::new()
            .name("Adder")
            .version("1.2")
            .misc("latency", 3);
        let attrs = meta.to_attributes();
        let keys: Vec<_> = attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["name", "version", "latency"]);
        assert_eq!(attrs.get("latency"), Some(&Attr::Int(3)));
    }

    #[test]
    fn explicit_provenance_is_kept() {
        let mut meta = Metadata::new().repo("https://example.com/hw.git");
        meta.fill_provenance(SourceLoc::caller());
        assert_eq!(meta.repo.as_deref(), Some("https://example.com/hw.git"));
        assert_eq!(meta.commit_hash, None);
    }

    #[test]
    fn provenance_follows_the_declaring_file() {
        let here = source_dir(SourceLoc::caller()).unwrap();
        assert!(here.join("metadata.rs").is_file());
        assert_eq!(source_dir(SourceLoc::UNKNOWN), None);
        assert_eq!(source_dir(SourceLoc::new("missing/dir/m.rs", 1, 1)), None);
    }
}
