use std::fs::{self, Metadata};
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

use log::warn;
use nix::libc;

use crate::error::{Error, IoResultExt, Result};

/// file-type bits as stored in target encodings (little-endian u16 on
/// the wire)
pub(crate) const TYPE_BITS_REGULAR: u16 = libc::S_IFREG as u16;

/// longest symlink target accepted; anything over this is a hard error
/// for the entry, never truncated
pub const SYMLINK_TARGET_MAX: usize = 1022;

/// file type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    Unknown,
}

impl FileType {
    /// detect file type from metadata
    pub fn from_metadata(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_file() {
            FileType::Regular
        } else if ft.is_dir() {
            FileType::Directory
        } else if ft.is_symlink() {
            FileType::Symlink
        } else if ft.is_block_device() {
            FileType::BlockDevice
        } else if ft.is_char_device() {
            FileType::CharDevice
        } else if ft.is_fifo() {
            FileType::Fifo
        } else if ft.is_socket() {
            FileType::Socket
        } else {
            FileType::Unknown
        }
    }

    /// type bits for the wire encoding of device and symlink targets
    pub(crate) fn type_bits(&self) -> u16 {
        let bits = match self {
            FileType::Regular => libc::S_IFREG,
            FileType::Directory => libc::S_IFDIR,
            FileType::Symlink => libc::S_IFLNK,
            FileType::BlockDevice => libc::S_IFBLK,
            FileType::CharDevice => libc::S_IFCHR,
            FileType::Fifo => libc::S_IFIFO,
            FileType::Socket => libc::S_IFSOCK,
            FileType::Unknown => 0,
        };
        bits as u16
    }
}

/// metadata captured for one tree entry
#[derive(Debug, Clone)]
pub struct EntryMeta {
    pub file_type: FileType,
    pub uid: u32,
    pub gid: u32,
    /// permission bits only (type bits stripped)
    pub mode: u32,
    pub size: u64,
    pub mtime: u64,
    /// raw device number for block/char devices
    pub rdev: u64,
    /// inode number (for hardlink detection)
    pub ino: u64,
    /// device id (for hardlink detection)
    pub dev: u64,
    /// number of hard links
    pub nlink: u64,
}

impl EntryMeta {
    /// read metadata from path (does not follow symlinks)
    pub fn from_path(path: &Path) -> Result<Self> {
        let meta = fs::symlink_metadata(path).with_path(path)?;
        Ok(Self::from_std_metadata(&meta))
    }

    /// create from std::fs::Metadata
    pub fn from_std_metadata(meta: &Metadata) -> Self {
        Self {
            file_type: FileType::from_metadata(meta),
            uid: meta.uid(),
            gid: meta.gid(),
            mode: meta.mode() & 0o7777,
            size: meta.len(),
            mtime: meta.mtime().max(0) as u64,
            rdev: meta.rdev(),
            ino: meta.ino(),
            dev: meta.dev(),
            nlink: meta.nlink(),
        }
    }

    /// could this entry share an inode with another record
    pub fn could_be_hardlink(&self) -> bool {
        self.file_type == FileType::Regular && self.nlink > 1
    }
}

/// one extended attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xattr {
    pub name: String,
    pub value: Vec<u8>,
}

impl Xattr {
    pub fn new(name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// read all extended attributes from a path.
///
/// individual unreadable attributes are skipped with a warning; only a
/// failing list operation (other than missing xattr support) is an error.
pub fn read_xattrs(path: &Path) -> Result<Vec<Xattr>> {
    let names: Vec<String> = match xattr::list(path) {
        Ok(iter) => iter.map(|n| n.to_string_lossy().into_owned()).collect(),
        Err(e) => {
            // ENOTSUP/ENODATA means no xattr support or no xattrs
            if e.raw_os_error() == Some(libc::ENOTSUP)
                || e.raw_os_error() == Some(libc::ENODATA)
                || e.raw_os_error() == Some(libc::EOPNOTSUPP)
            {
                return Ok(vec![]);
            }
            return Err(Error::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let mut xattrs = Vec::new();
    for name in names {
        match xattr::get(path, &name) {
            Ok(Some(value)) => xattrs.push(Xattr::new(name, value)),
            Ok(None) => {
                // removed between list and get, skip it
            }
            Err(e) => {
                if e.raw_os_error() != Some(libc::ENODATA) {
                    warn!("failed to read xattr {} on {:?}: {}", name, path, e);
                }
            }
        }
    }

    // sort for determinism
    xattrs.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(xattrs)
}

/// read symlink target, enforcing the maximum target length
pub fn read_symlink_target(path: &Path) -> Result<String> {
    let target = fs::read_link(path).with_path(path)?;
    let target = target.to_string_lossy().into_owned();
    if target.len() > SYMLINK_TARGET_MAX {
        return Err(Error::SymlinkTargetTooLong {
            path: path.to_path_buf(),
            len: target.len(),
            max: SYMLINK_TARGET_MAX,
        });
    }
    Ok(target)
}

/// resolve a uid to a user name, falling back to the numeric string
pub fn resolve_user(uid: u32) -> String {
    match nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => uid.to_string(),
    }
}

/// resolve a gid to a group name, falling back to the numeric string
pub fn resolve_group(gid: u32) -> String {
    match nix::unistd::Group::from_gid(nix::unistd::Gid::from_raw(gid)) {
        Ok(Some(group)) => group.name,
        _ => gid.to_string(),
    }
}
