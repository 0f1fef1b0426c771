//! burlap - package metadata codec and assembler
//!
//! a self-describing binary container for package metadata plus a
//! streaming artifact format carrying the packaged file contents.
//!
//! # Core concepts
//!
//! - **Document**: an append-only buffer of tagged value words; sealed
//!   once, then immutable apart from the embedded package id
//! - **Schema**: static field tables giving every object slot a name,
//!   a 1-based index, and a kind
//! - **Artifact**: a zstd-compressed document followed by uncompressed
//!   data blocks, one per regular file that owns its content
//! - **Package id**: the leading bytes of a SHA-256 over the sealed
//!   document, embedded in the pkginfo record
//!
//! # Example usage
//!
//! ```no_run
//! use burlap::{build_package, BuildOptions, NoTrust, PackageReader};
//! use std::path::Path;
//!
//! // assemble a package from a staged tree
//! let mut opts = BuildOptions::new();
//! opts.set_info("name:hello").unwrap();
//! opts.set_info("version:1.0").unwrap();
//! let out = std::fs::File::create("hello.pkg").unwrap();
//! build_package(Some(Path::new("/staged")), opts, out, "hello.pkg").unwrap();
//!
//! // read it back
//! let input = std::fs::File::open("hello.pkg").unwrap();
//! let mut pkg = PackageReader::open(input, &NoTrust).unwrap();
//! for block in pkg.expected_blocks().to_vec() {
//!     let mut payload = Vec::new();
//!     pkg.next_block(&mut payload).unwrap();
//!     println!("{}:{} {} bytes", block.path_idx, block.file_idx, payload.len());
//! }
//! ```

mod assemble;
mod emit;
mod error;
mod hardlink;
mod package;
mod pathstack;
mod read;

pub mod digest;
pub mod document;
pub mod fsmeta;
pub mod schema;
pub mod value;

pub use assemble::{build_package, BuildSummary, BLOCK_SIZE};
pub use digest::{ContentHasher, Digest, PACKAGE_ID_LEN};
pub use emit::{ArtifactWriter, Compression, ARTIFACT_MAGIC, BLOCK_HEADER_LEN};
pub use error::{Error, Result};
pub use package::{BuildOptions, DEFAULT_ARCH};
pub use read::{BlockInfo, ExpectedId, NoTrust, PackageReader, Trust};
