//! Byte-signature classification of class files.
//!
//! A class file is first identified by the SHA-256 of its exact bytes. When
//! the digest is unknown, a short list of heuristic rules catches rebuilt or
//! repackaged classes that still lack a security fix.

use memchr::memmem;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::hashes::KnownHashes;
use crate::vuln::Vulnerabilities;

/// Magic number at the start of every Java class file.
pub const CLASS_MAGIC: [u8; 4] = [0xca, 0xfe, 0xba, 0xbe];

/// A classification verdict for one class file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub version: String,
    pub filename: String,
    pub vulns: Vulnerabilities,
}

/// A heuristic that flags a class by name fragment and content.
pub struct Rule {
    pub name: &'static str,
    pub vuln: Vulnerabilities,
    /// Lowercase fragment the member name must contain.
    pub file_fragment: &'static str,
    /// Match the fragment against the full member path instead of its basename.
    pub match_path: bool,
    pub label: &'static str,
    pub content: fn(&[u8]) -> bool,
}

impl Rule {
    fn matches(&self, content: &[u8], filename: &str) -> bool {
        let subject = if self.match_path {
            filename
        } else {
            basename(filename)
        };
        subject.to_lowercase().contains(self.file_fragment) && (self.content)(content)
    }
}

pub static RULES: &[Rule] = &[
    // Debian's CVE-2019-17571 patch wraps the stream in FilteredObjectInputStream.
    Rule {
        name: "socketnode-unfiltered",
        vuln: Vulnerabilities::CVE_2019_17571,
        file_fragment: "socketnode.",
        match_path: false,
        label: "SocketNode class missing FilteredObjectInputStream patch",
        content: |buf| {
            is_class_file(buf)
                && contains(buf, b"org/apache/log4j")
                && !contains(buf, b"FilteredObjectInputStream")
        },
    },
    Rule {
        name: "jndimanager-unpatched",
        vuln: Vulnerabilities::CVE_2021_44228,
        file_fragment: "jndimanager.",
        match_path: false,
        label: "JndiManager class missing new error message string literal",
        content: |buf| {
            // 2.15+ uses one space, the 2.12.2 backport two.
            is_class_file(buf)
                && !contains(buf, b"Invalid JNDI URI - {}")
                && !contains(buf, b"Invalid  JNDI URI - {}")
        },
    },
    Rule {
        name: "chainsaw-main",
        vuln: Vulnerabilities::CVE_2022_23307,
        file_fragment: "chainsaw/main.",
        match_path: true,
        label: "Chainsaw Main.class found",
        content: |_| true,
    },
];

/// Classify `content` read from the archive member `filename`.
///
/// Only vulnerabilities in `interested` are ever reported.
pub fn classify(
    content: &[u8],
    filename: &str,
    interested: Vulnerabilities,
    hashes: &dyn KnownHashes,
) -> Option<Finding> {
    if let Some(known) = hashes.lookup(&hash_content(content)) {
        let vulns = known.vulns & interested;
        if !vulns.is_empty() {
            return Some(Finding {
                version: known.version.to_string(),
                filename: known.filename.to_string(),
                vulns,
            });
        }
    }

    RULES
        .iter()
        .filter(|rule| interested.contains_any(rule.vuln))
        .find(|rule| rule.matches(content, filename))
        .map(|rule| Finding {
            version: rule.label.to_string(),
            filename: basename(filename).to_string(),
            vulns: rule.vuln,
        })
}

pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

pub fn is_class_file(buf: &[u8]) -> bool {
    buf.starts_with(&CLASS_MAGIC)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    memmem::find(haystack, needle).is_some()
}

fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashes::{BuiltinHashes, KnownArtifact};
    use std::collections::HashMap;

    fn class_with(body: &[u8]) -> Vec<u8> {
        let mut buf = CLASS_MAGIC.to_vec();
        buf.extend_from_slice(&[0, 0, 0, 52]);
        buf.extend_from_slice(body);
        buf
    }

    fn table_for(content: &[u8], vulns: Vulnerabilities) -> HashMap<String, KnownArtifact> {
        HashMap::from([(
            hash_content(content),
            KnownArtifact {
                version: "log4j 2.14.0-2.14.1",
                filename: "JndiManager.class",
                vulns,
            },
        )])
    }

    #[test]
    fn hash_match_reports_intersected_mask() {
        let content = class_with(b"known artifact");
        let table = table_for(
            &content,
            Vulnerabilities::CVE_2021_44228 | Vulnerabilities::CVE_2021_45105,
        );

        let finding = classify(
            &content,
            "a/b/Whatever.class",
            Vulnerabilities::CVE_2021_44228 | Vulnerabilities::CVE_2019_17571,
            &table,
        )
        .unwrap();
        assert_eq!(finding.vulns, Vulnerabilities::CVE_2021_44228);
        assert_eq!(finding.version, "log4j 2.14.0-2.14.1");
        assert_eq!(finding.filename, "JndiManager.class");
    }

    #[test]
    fn hash_match_with_empty_intersection_is_silent() {
        let content = class_with(b"known artifact");
        let table = table_for(&content, Vulnerabilities::CVE_2021_45105);
        assert!(classify(&content, "Foo.class", Vulnerabilities::DEFAULT, &table).is_none());
    }

    #[test]
    fn jndimanager_without_fix_string_is_vulnerable() {
        let content = class_with(b"org/apache/logging/log4j/core/net/JndiManager");
        let finding = classify(
            &content,
            "org/apache/logging/log4j/core/net/JndiManager.class",
            Vulnerabilities::CVE_2021_44228,
            &BuiltinHashes,
        )
        .unwrap();
        assert_eq!(finding.vulns, Vulnerabilities::CVE_2021_44228);
        assert_eq!(finding.filename, "JndiManager.class");
    }

    #[test]
    fn jndimanager_with_either_fix_string_is_not_vulnerable() {
        for fix in [&b"Invalid JNDI URI - {}"[..], &b"Invalid  JNDI URI - {}"[..]] {
            let content = class_with(fix);
            assert!(
                classify(
                    &content,
                    "JndiManager.class",
                    Vulnerabilities::ALL,
                    &BuiltinHashes
                )
                .is_none()
            );
        }
    }

    #[test]
    fn jndimanager_rule_requires_magic_and_interest() {
        let content = b"no magic here".to_vec();
        assert!(classify(&content, "JndiManager.class", Vulnerabilities::ALL, &BuiltinHashes).is_none());

        let content = class_with(b"");
        assert!(
            classify(
                &content,
                "JndiManager.class",
                Vulnerabilities::CVE_2019_17571,
                &BuiltinHashes
            )
            .is_none()
        );
    }

    #[test]
    fn socketnode_rule_checks_package_and_patch_marker() {
        let unpatched = class_with(b"org/apache/log4j/net/SocketNode");
        let finding = classify(
            &unpatched,
            "org/apache/log4j/net/SocketNode.class",
            Vulnerabilities::DEFAULT,
            &BuiltinHashes,
        )
        .unwrap();
        assert_eq!(finding.vulns, Vulnerabilities::CVE_2019_17571);

        let patched = class_with(b"org/apache/log4j/net/SocketNode FilteredObjectInputStream");
        assert!(classify(&patched, "SocketNode.class", Vulnerabilities::DEFAULT, &BuiltinHashes).is_none());

        let foreign = class_with(b"com/example/SocketNode");
        assert!(classify(&foreign, "SocketNode.class", Vulnerabilities::DEFAULT, &BuiltinHashes).is_none());
    }

    #[test]
    fn chainsaw_main_matches_on_name_alone() {
        let finding = classify(
            b"",
            "org/apache/log4j/chainsaw/Main.class",
            Vulnerabilities::CVE_2022_23307,
            &BuiltinHashes,
        )
        .unwrap();
        assert_eq!(finding.filename, "Main.class");
        assert!(classify(b"", "com/example/Main.class", Vulnerabilities::ALL, &BuiltinHashes).is_none());
    }

    #[test]
    fn short_buffers_do_not_panic() {
        for buf in [&b""[..], &[0xca][..], &[0xca, 0xfe, 0xba][..]] {
            assert!(classify(buf, "JndiManager.class", Vulnerabilities::ALL, &BuiltinHashes).is_none());
            assert!(classify(buf, "SocketNode.class", Vulnerabilities::ALL, &BuiltinHashes).is_none());
        }
    }
}
