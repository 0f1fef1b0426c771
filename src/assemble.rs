//! package assembly.
//!
//! one build runs `Init -> Walk -> Seal -> Digest -> Fixup -> Emit`,
//! depth-first and single-threaded. every resource (document buffer,
//! path stack, hardlink arena) is scoped to the build and dropped on
//! every exit path. any io error while reading an entry aborts the
//! whole build tagged with the offending path; no partial artifact is
//! valid, and atomic replacement of a previous artifact is the caller's
//! concern.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use log::{debug, warn};

use crate::digest::{ContentHasher, Digest, PACKAGE_ID_LEN};
use crate::document::{ArrayWriter, Document, ObjectReader, ObjectWriter};
use crate::emit::ArtifactWriter;
use crate::error::{Error, IoResultExt, Result};
use crate::fsmeta::{self, EntryMeta, FileType};
use crate::hardlink::{HardlinkResolver, TargetTable};
use crate::package::{set_from_string, BuildOptions};
use crate::pathstack::PathStack;
use crate::schema::{
    ACL_GROUP, ACL_MODE, ACL_USER, ACL_XATTRS, DI_ACL, DI_FILES, DI_NAME, FI_ACL, FI_HASHES,
    FI_MTIME, FI_NAME, FI_SIZE, FI_TARGET, PI_HASHES, PI_INSTALLED_SIZE, PKG_PATHS, PKG_PKGINFO,
    PKG_REPLACES_PRIORITY, PKG_SCRIPTS, PKG_TRIGGERS, ROOT_SCHEMA_PACKAGE, SCHEMA_DIR,
    SCHEMA_DIR_ARRAY, SCHEMA_FILE, SCHEMA_FILE_ARRAY, SCHEMA_PACKAGE, SCHEMA_PKGINFO,
    SCHEMA_SCRIPTS, SCHEMA_STRING_ARRAY, SCHEMA_XATTR_ARRAY,
};
use crate::value::Value;

/// installed size is charged in whole blocks of this size
pub const BLOCK_SIZE: u64 = 4096;

/// outcome of a successful build
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// content digest over the sealed document (its leading bytes are
    /// the embedded package id)
    pub digest: Digest,
    /// sum of per-inode block-rounded sizes
    pub installed_size: u64,
}

/// assemble one package from a filesystem tree and stream the artifact
/// into `out`. `out_name` tags output errors; the caller owns atomic
/// replacement of any previous artifact at that destination.
pub fn build_package<W: Write>(
    files_dir: Option<&Path>,
    mut opts: BuildOptions,
    out: W,
    out_name: &str,
) -> Result<BuildSummary> {
    opts.finish_init()?;
    let asm = Assembler {
        doc: Document::new(ROOT_SCHEMA_PACKAGE),
        paths: ArrayWriter::new(&SCHEMA_DIR_ARRAY),
        path: PathStack::new(),
        links: HardlinkResolver::new(),
        installed_size: 0,
        opts: &opts,
    };
    asm.run(files_dir, out, out_name)
}

struct Assembler<'a> {
    doc: Document,
    paths: ArrayWriter,
    path: PathStack,
    links: HardlinkResolver,
    installed_size: u64,
    opts: &'a BuildOptions,
}

impl Assembler<'_> {
    fn run<W: Write>(
        mut self,
        files_dir: Option<&Path>,
        out: W,
        out_name: &str,
    ) -> Result<BuildSummary> {
        let mut pkg = ObjectWriter::new(&SCHEMA_PACKAGE);
        let mut pkgi = ObjectWriter::new(&SCHEMA_PKGINFO);
        self.opts.assign_info(&mut self.doc, &mut pkgi)?;

        if let Some(root) = files_dir {
            debug!("walking {}", root.display());
            let meta = EntryMeta::from_path(root)?;
            if meta.file_type != FileType::Directory {
                return Err(Error::NotADirectory(root.to_path_buf()));
            }
            self.walk_directory(root, &meta)?;
            if self.installed_size == 0 {
                self.installed_size = BLOCK_SIZE;
            }
        }

        // seal: pkginfo (with the id blob reserved), paths, extras, root
        pkgi.set_int(&mut self.doc, PI_INSTALLED_SIZE, self.installed_size)?;
        let id_slot = self.doc.append_blob(&[0u8; PACKAGE_ID_LEN])?;
        pkgi.set(&mut self.doc, PI_HASHES, id_slot)?;

        let pkgi_v = pkgi.seal(&mut self.doc)?;
        pkg.set(&mut self.doc, PKG_PKGINFO, pkgi_v)?;

        let paths = std::mem::replace(&mut self.paths, ArrayWriter::new(&SCHEMA_DIR_ARRAY));
        let paths_v = paths.seal(&mut self.doc)?;
        pkg.set(&mut self.doc, PKG_PATHS, paths_v)?;

        if self.opts.has_scripts() {
            let mut scripts = ObjectWriter::new(&SCHEMA_SCRIPTS);
            for (index, body) in self.opts.scripts() {
                scripts.set_blob(&mut self.doc, index, body)?;
            }
            let scripts_v = scripts.seal(&mut self.doc)?;
            pkg.set(&mut self.doc, PKG_SCRIPTS, scripts_v)?;
        }
        if !self.opts.triggers().is_empty() {
            let mut triggers = ArrayWriter::new(&SCHEMA_STRING_ARRAY);
            for trigger in self.opts.triggers() {
                let v = self.doc.append_blob(trigger.as_bytes())?;
                triggers.append(&mut self.doc, v)?;
            }
            let triggers_v = triggers.seal(&mut self.doc)?;
            pkg.set(&mut self.doc, PKG_TRIGGERS, triggers_v)?;
        }
        if let Some(priority) = self.opts.replaces_priority() {
            set_from_string(&mut pkg, &mut self.doc, PKG_REPLACES_PRIORITY, priority)?;
        }

        let pkg_v = pkg.seal(&mut self.doc)?;
        self.doc.seal_root(pkg_v)?;

        // digest: overwrite the reserved id blob with the digest of the
        // sealed bytes; the slot's size was fixed before sealing
        let digest = Digest::of(self.doc.as_bytes());
        self.doc.overwrite_blob(id_slot, digest.package_id())?;
        debug!("package id {}", hex::encode(digest.package_id()));

        // emit the header from the sealed bytes, then run the fixup
        // pass; the resolved-path blobs it appends are reader-local and
        // never serialized
        let mut writer = ArtifactWriter::new(out, out_name);
        writer.write_header(self.doc.as_bytes(), self.opts.compression)?;
        let table = TargetTable::build(&mut self.doc)?;
        self.emit_blocks(files_dir, &table, &mut writer)?;

        // the close is where buffered errors surface
        writer.finish()?;

        Ok(BuildSummary {
            digest,
            installed_size: self.installed_size,
        })
    }

    /// recurse into one directory, appending child directory records
    /// before this directory's own (tree order is post-order)
    fn walk_directory(&mut self, fs_dir: &Path, meta: &EntryMeta) -> Result<()> {
        let dirname = self.path.as_str().to_string();

        let mut dir_w = ObjectWriter::new(&SCHEMA_DIR);
        dir_w.set_blob(&mut self.doc, DI_NAME, dirname.as_bytes())?;
        if !dirname.is_empty() || self.opts.rootnode {
            let acl = self.build_acl(fs_dir, meta)?;
            dir_w.set(&mut self.doc, DI_ACL, acl)?;
        }

        let mut files = ArrayWriter::new(&SCHEMA_FILE_ARRAY);

        let mut entries: Vec<_> = fs::read_dir(fs_dir)
            .with_path(fs_dir)?
            .collect::<std::io::Result<Vec<_>>>()
            .with_path(fs_dir)?;
        // sort for reproducible output independent of enumeration order
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for entry in entries {
            let fs_path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = EntryMeta::from_path(&fs_path)?;

            match meta.file_type {
                FileType::Directory => {
                    let token = self.path.push(&name);
                    let r = self.walk_directory(&fs_path, &meta);
                    self.path.pop(token);
                    r?;
                }
                FileType::Socket | FileType::Unknown => {
                    let token = self.path.push(&name);
                    warn!("{}: special file ignored", self.path.as_str());
                    self.path.pop(token);
                }
                _ => self.add_file_record(&fs_path, &name, &meta, &mut files)?,
            }
        }

        // an empty suppressed root leaves no record at all
        if dirname.is_empty() && !self.opts.rootnode && files.is_empty() {
            return Ok(());
        }

        let files_v = files.seal(&mut self.doc)?;
        dir_w.set(&mut self.doc, DI_FILES, files_v)?;
        let dir_v = dir_w.seal(&mut self.doc)?;
        self.paths.append(&mut self.doc, dir_v)
    }

    /// append one non-directory record to the enclosing files array
    fn add_file_record(
        &mut self,
        fs_path: &Path,
        name: &str,
        meta: &EntryMeta,
        files: &mut ArrayWriter,
    ) -> Result<()> {
        let mut fio = ObjectWriter::new(&SCHEMA_FILE);
        fio.set_blob(&mut self.doc, FI_NAME, name.as_bytes())?;
        fio.set_int(&mut self.doc, FI_MTIME, meta.mtime)?;

        match meta.file_type {
            FileType::Regular => {
                let mut link_target = Value::Null;
                if meta.could_be_hardlink() {
                    let (placeholder, first_seen) = self.links.intern(meta.dev, meta.ino);
                    link_target = placeholder;
                    if !first_seen {
                        // later links: no digest, no size, no content read
                        fio.set(&mut self.doc, FI_TARGET, placeholder)?;
                        let acl = self.build_acl(fs_path, meta)?;
                        fio.set(&mut self.doc, FI_ACL, acl)?;
                        let sealed = fio.seal(&mut self.doc)?;
                        return files.append(&mut self.doc, sealed);
                    }
                }
                let digest = digest_file(fs_path)?;
                let digest_v = self.doc.append_blob(digest.as_bytes())?;
                fio.set(&mut self.doc, FI_HASHES, digest_v)?;
                fio.set_int(&mut self.doc, FI_SIZE, meta.size)?;
                fio.set(&mut self.doc, FI_TARGET, link_target)?;
                // each inode's size is charged once, in whole blocks
                self.installed_size += (meta.size + BLOCK_SIZE - 1) & !(BLOCK_SIZE - 1);
            }
            FileType::BlockDevice | FileType::CharDevice | FileType::Fifo => {
                let type_bits = meta.file_type.type_bits().to_le_bytes();
                let dev = meta.rdev.to_le_bytes();
                let target = self.doc.append_blob_vec(&[&type_bits, &dev])?;
                fio.set(&mut self.doc, FI_TARGET, target)?;
            }
            FileType::Symlink => {
                let link = fsmeta::read_symlink_target(fs_path)?;
                let type_bits = meta.file_type.type_bits().to_le_bytes();
                let target = self.doc.append_blob_vec(&[&type_bits, link.as_bytes()])?;
                fio.set(&mut self.doc, FI_TARGET, target)?;
            }
            FileType::Directory | FileType::Socket | FileType::Unknown => unreachable!(),
        }

        let acl = self.build_acl(fs_path, meta)?;
        fio.set(&mut self.doc, FI_ACL, acl)?;
        let sealed = fio.seal(&mut self.doc)?;
        files.append(&mut self.doc, sealed)
    }

    /// permissions, owner and group names, and the xattr array
    fn build_acl(&mut self, fs_path: &Path, meta: &EntryMeta) -> Result<Value> {
        let mut acl = ObjectWriter::new(&crate::schema::SCHEMA_ACL);
        acl.set_int(&mut self.doc, ACL_MODE, meta.mode as u64)?;
        acl.set_blob(&mut self.doc, ACL_USER, fsmeta::resolve_user(meta.uid).as_bytes())?;
        acl.set_blob(
            &mut self.doc,
            ACL_GROUP,
            fsmeta::resolve_group(meta.gid).as_bytes(),
        )?;

        let xattrs = fsmeta::read_xattrs(fs_path)?;
        if !xattrs.is_empty() {
            let mut xa = ArrayWriter::new(&SCHEMA_XATTR_ARRAY);
            for xattr in &xattrs {
                let v = self
                    .doc
                    .append_blob_vec(&[xattr.name.as_bytes(), b"\0", &xattr.value])?;
                xa.append(&mut self.doc, v)?;
            }
            let xa_v = xa.seal(&mut self.doc)?;
            acl.set(&mut self.doc, ACL_XATTRS, xa_v)?;
        }
        acl.seal(&mut self.doc)
    }

    /// stream the data blocks: regular, non-hardlinked, non-empty
    /// files only, in tree order
    fn emit_blocks<W: Write>(
        &mut self,
        files_dir: Option<&Path>,
        table: &TargetTable,
        writer: &mut ArtifactWriter<W>,
    ) -> Result<()> {
        if let Some(root) = files_dir {
            let doc = &self.doc;
            let path = &mut self.path;
            let pkg = ObjectReader::root(doc, &SCHEMA_PACKAGE)?;
            if let Some(paths) = pkg.get_arr(PKG_PATHS)? {
                for i in 1..=paths.len() {
                    let dir = paths.obj(i)?;
                    let dirname =
                        String::from_utf8_lossy(dir.get_blob(DI_NAME)?.unwrap_or(b"")).into_owned();
                    let files = match dir.get_arr(DI_FILES)? {
                        Some(files) => files,
                        None => continue,
                    };
                    path.set(&dirname);
                    for j in 1..=files.len() {
                        let file = files.obj(j)?;
                        let target = table.present(file.get(FI_TARGET)?, i as u32, j as u32)?;
                        if !target.is_null() {
                            continue;
                        }
                        let size = file.get_int(FI_SIZE)?.unwrap_or(0);
                        if size == 0 {
                            continue;
                        }
                        let name = String::from_utf8_lossy(file.get_blob(FI_NAME)?.unwrap_or(b""))
                            .into_owned();
                        let token = path.push(&name);
                        let src = path.under(root);
                        let r = File::open(&src)
                            .with_path(&src)
                            .and_then(|f| writer.write_block(i as u32, j as u32, size, &src, f));
                        path.pop(token);
                        r?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// stream a file's content through the digest
fn digest_file(path: &Path) -> Result<Digest> {
    let mut file = File::open(path).with_path(path)?;
    let mut hasher = ContentHasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).with_path(path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::{NoTrust, PackageReader};
    use crate::schema::{PI_ARCH, PI_NAME, PI_VERSION};
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    fn opts(name: &str, version: &str) -> BuildOptions {
        let mut o = BuildOptions::new();
        o.set_info(&format!("name:{name}")).unwrap();
        o.set_info(&format!("version:{version}")).unwrap();
        o
    }

    fn build_to_vec(dir: Option<&Path>, o: BuildOptions) -> (Vec<u8>, BuildSummary) {
        let mut out = Vec::new();
        let summary = build_package(dir, o, &mut out, "test.pkg").unwrap();
        (out, summary)
    }

    #[test]
    fn test_missing_required_fields() {
        let mut o = BuildOptions::new();
        o.set_info("name:x").unwrap();
        let err = build_package(None, o, Vec::new(), "test.pkg").unwrap_err();
        assert!(matches!(err, Error::MissingField("version")));
    }

    #[test]
    fn test_metadata_only_package() {
        let (bytes, _) = build_to_vec(None, opts("meta", "1.0"));
        let pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        let pkgi = pkg.pkginfo().unwrap();
        assert_eq!(pkgi.get_blob(PI_NAME).unwrap(), Some(&b"meta"[..]));
        assert_eq!(pkgi.get_blob(PI_VERSION).unwrap(), Some(&b"1.0"[..]));
        assert_eq!(
            pkgi.get_blob(PI_ARCH).unwrap(),
            Some(crate::package::DEFAULT_ARCH.as_bytes())
        );
        // no files dir: no paths, no blocks, zero installed size
        assert_eq!(pkgi.get_int(PI_INSTALLED_SIZE).unwrap(), Some(0));
        assert!(pkg.expected_blocks().is_empty());
    }

    #[test]
    fn test_simple_tree_blocks() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("hello.txt"), b"hello world").unwrap();

        let (bytes, summary) = build_to_vec(Some(&src), opts("hello", "1"));
        assert_eq!(summary.installed_size, BLOCK_SIZE);

        let mut pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        let blocks = pkg.expected_blocks().to_vec();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].size, 11);

        let mut payload = Vec::new();
        let block = pkg.next_block(&mut payload).unwrap().unwrap();
        assert_eq!((block.path_idx, block.file_idx), (blocks[0].path_idx, blocks[0].file_idx));
        assert_eq!(payload, b"hello world");
        assert!(pkg.next_block(&mut Vec::new()).unwrap().is_none());
    }

    #[test]
    fn test_determinism() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a"), b"alpha").unwrap();
        fs::write(src.join("sub/b"), b"beta").unwrap();

        let (bytes1, s1) = build_to_vec(Some(&src), opts("det", "1"));
        let (bytes2, s2) = build_to_vec(Some(&src), opts("det", "1"));
        assert_eq!(bytes1, bytes2);
        assert_eq!(s1.digest, s2.digest);
    }

    #[test]
    fn test_embedded_id_matches_recomputed_digest() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("f"), b"data").unwrap();

        let (bytes, summary) = build_to_vec(Some(&src), opts("idcheck", "1"));
        let pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        assert_eq!(pkg.package_id().unwrap(), summary.digest.package_id());
        assert!(pkg.verify_id().unwrap());
    }

    #[test]
    fn test_hardlink_scenario() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a"), vec![1u8; 10]).unwrap();
        fs::write(src.join("b"), vec![2u8; 4096]).unwrap();
        fs::hard_link(src.join("b"), src.join("c")).unwrap();
        fs::create_dir(src.join("d")).unwrap();

        let (bytes, summary) = build_to_vec(Some(&src), opts("links", "1"));
        // a: one block; b and c: one shared inode, one block
        assert_eq!(summary.installed_size, 2 * BLOCK_SIZE);

        let mut pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();

        // sorted walk, post-order dirs: paths = [d, root]
        let dirs = pkg.dir_names().unwrap();
        assert_eq!(dirs, vec!["d".to_string(), String::new()]);

        // root files: a, b carry digests; c resolves to b
        let root_files = pkg.file_names(2).unwrap();
        assert_eq!(root_files, vec!["a", "b", "c"]);
        assert!(pkg.file_digest(2, 1).unwrap().is_some());
        assert!(pkg.file_digest(2, 2).unwrap().is_some());
        assert!(pkg.file_digest(2, 3).unwrap().is_none());

        let target = pkg.file_target(2, 3).unwrap().unwrap();
        // {type bits LE, canonical path}
        assert_eq!(&target[..2], &fsmeta::TYPE_BITS_REGULAR.to_le_bytes());
        assert_eq!(&target[2..], b"b");
        // b itself is canonical: no presented target
        assert!(pkg.file_target(2, 2).unwrap().is_none());

        // data blocks: a and b only, in tree order
        let blocks = pkg.expected_blocks().to_vec();
        assert_eq!(blocks.len(), 2);
        assert_eq!((blocks[0].path_idx, blocks[0].file_idx), (2, 1));
        assert_eq!((blocks[1].path_idx, blocks[1].file_idx), (2, 2));

        let mut payload = Vec::new();
        pkg.next_block(&mut payload).unwrap().unwrap();
        assert_eq!(payload.len(), 10);
        payload.clear();
        pkg.next_block(&mut payload).unwrap().unwrap();
        assert_eq!(payload, vec![2u8; 4096]);
    }

    #[test]
    fn test_hardlink_across_directories() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("b"), vec![7u8; 100]).unwrap();
        fs::create_dir(src.join("sub")).unwrap();
        fs::hard_link(src.join("b"), src.join("sub/x")).unwrap();

        let (bytes, summary) = build_to_vec(Some(&src), opts("xlinks", "1"));
        assert_eq!(summary.installed_size, BLOCK_SIZE);

        let mut pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        // post-order puts sub's record before the root's, but b in the
        // root carries the content and must stay canonical
        assert_eq!(
            pkg.dir_names().unwrap(),
            vec!["sub".to_string(), String::new()]
        );
        assert!(pkg.file_digest(2, 1).unwrap().is_some());
        assert!(pkg.file_digest(1, 1).unwrap().is_none());
        assert!(pkg.file_target(2, 1).unwrap().is_none());
        let target = pkg.file_target(1, 1).unwrap().unwrap();
        assert_eq!(&target[2..], b"b");

        let blocks = pkg.expected_blocks().to_vec();
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            (blocks[0].path_idx, blocks[0].file_idx, blocks[0].size),
            (2, 1, 100)
        );
        let mut payload = Vec::new();
        pkg.next_block(&mut payload).unwrap().unwrap();
        assert_eq!(payload, vec![7u8; 100]);
    }

    #[test]
    fn test_root_suppression() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();

        let mut o = opts("empty", "1");
        o.rootnode = false;
        let (bytes, summary) = build_to_vec(Some(&src), o);
        // an empty tree still charges one block
        assert_eq!(summary.installed_size, BLOCK_SIZE);

        let pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        assert!(pkg.dir_names().unwrap().is_empty());
    }

    #[test]
    fn test_empty_root_with_rootnode() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();

        let (bytes, _) = build_to_vec(Some(&src), opts("rooted", "1"));
        let pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        assert_eq!(pkg.dir_names().unwrap(), vec![String::new()]);
    }

    #[test]
    fn test_symlink_record() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();
        symlink("/usr/bin/true", src.join("link")).unwrap();

        let (bytes, _) = build_to_vec(Some(&src), opts("sym", "1"));
        let pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        let target = pkg.file_target(1, 1).unwrap().unwrap();
        assert_eq!(&target[..2], &FileType::Symlink.type_bits().to_le_bytes());
        assert_eq!(&target[2..], b"/usr/bin/true");
        // symlinks never get data blocks
        assert!(pkg.expected_blocks().is_empty());
    }

    #[test]
    fn test_overlong_symlink_fails() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();
        let target = "x".repeat(fsmeta::SYMLINK_TARGET_MAX + 1);
        symlink(&target, src.join("link")).unwrap();

        let err = build_package(Some(&src), opts("sym", "1"), Vec::new(), "test.pkg").unwrap_err();
        assert!(matches!(err, Error::SymlinkTargetTooLong { .. }));
    }

    #[test]
    fn test_scripts_and_triggers() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();

        let mut o = opts("scripted", "2");
        o.set_script("post-install", b"#!/bin/sh\nexit 0\n".to_vec())
            .unwrap();
        o.add_trigger("/usr/share/icons/*");

        let (bytes, _) = build_to_vec(Some(&src), o);
        let pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        assert_eq!(
            pkg.script(crate::schema::SCRPT_POST_INSTALL).unwrap(),
            Some(b"#!/bin/sh\nexit 0\n".to_vec())
        );
        assert_eq!(pkg.script(crate::schema::SCRPT_PRE_INSTALL).unwrap(), None);
        assert_eq!(pkg.triggers().unwrap(), vec!["/usr/share/icons/*"]);
    }

    #[test]
    fn test_not_a_directory() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("plain");
        fs::write(&file, b"x").unwrap();

        let err = build_package(Some(&file), opts("x", "1"), Vec::new(), "test.pkg").unwrap_err();
        assert!(matches!(err, Error::NotADirectory(_)));
    }

    #[test]
    fn test_uncompressed_header_option() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("f"), b"payload").unwrap();

        let mut o = opts("plain", "1");
        o.compression = crate::emit::Compression::None;
        let (bytes, _) = build_to_vec(Some(&src), o);

        let mut pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        let mut payload = Vec::new();
        pkg.next_block(&mut payload).unwrap().unwrap();
        assert_eq!(payload, b"payload");
    }
}
