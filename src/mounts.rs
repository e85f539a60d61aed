//! Filesystem classification used to prune pseudo and network mounts from a walk.

use std::path::{Path, PathBuf};

/// Answers whether a path lives on a filesystem the walk should not descend into.
pub trait FilesystemProbe: Send + Sync {
    fn is_pseudo(&self, path: &Path) -> bool;
    fn is_network(&self, path: &Path) -> bool;
}

const PSEUDO_TYPES: &[&str] = &[
    "proc",
    "sysfs",
    "devtmpfs",
    "devpts",
    "devfs",
    "cgroup",
    "cgroup2",
    "debugfs",
    "tracefs",
    "securityfs",
    "bpf",
    "pstore",
    "configfs",
    "fusectl",
    "mqueue",
    "hugetlbfs",
    "binfmt_misc",
    "efivarfs",
    "selinuxfs",
    "nsfs",
    "autofs",
];

const NETWORK_TYPES: &[&str] = &[
    "nfs",
    "nfs4",
    "cifs",
    "smbfs",
    "smb3",
    "ncpfs",
    "afs",
    "afpfs",
    "ceph",
    "glusterfs",
    "9p",
    "webdav",
    "davfs",
    "fuse.sshfs",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub mount_point: PathBuf,
    pub fs_type: String,
}

/// Mount points and their filesystem types, as listed by the kernel.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    mounts: Vec<Mount>,
}

impl MountTable {
    pub const SYSTEM_TABLE: &'static str = "/proc/self/mounts";

    /// Read the running system's mount table. An unreadable table classifies every path as local.
    pub fn load() -> Self {
        match std::fs::read_to_string(Self::SYSTEM_TABLE) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                log::debug!("mount table unavailable ({e}); no filesystems will be excluded");
                Self::default()
            }
        }
    }

    /// Parse `fstab`-style lines: `device mount-point type options dump pass`.
    pub fn parse(text: &str) -> Self {
        let mut mounts: Vec<Mount> = text
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let _device = fields.next()?;
                let mount_point = fields.next()?;
                let fs_type = fields.next()?;
                Some(Mount {
                    mount_point: PathBuf::from(unescape(mount_point)),
                    fs_type: fs_type.to_string(),
                })
            })
            .collect();
        // Deepest mount points first; later mounts on the same point shadow earlier ones.
        mounts.reverse();
        mounts.sort_by_key(|m| std::cmp::Reverse(m.mount_point.components().count()));
        Self { mounts }
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// Filesystem type of the mount containing `path`.
    pub fn fs_type(&self, path: &Path) -> Option<&str> {
        self.mounts
            .iter()
            .find(|m| path.starts_with(&m.mount_point))
            .map(|m| m.fs_type.as_str())
    }
}

impl FilesystemProbe for MountTable {
    fn is_pseudo(&self, path: &Path) -> bool {
        self.fs_type(path)
            .is_some_and(|t| PSEUDO_TYPES.contains(&t))
    }

    fn is_network(&self, path: &Path) -> bool {
        self.fs_type(path)
            .is_some_and(|t| NETWORK_TYPES.contains(&t) || t.starts_with("nfs"))
    }
}

/// Decode the octal escapes (`\040` for space and friends) the kernel uses in mount tables.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
