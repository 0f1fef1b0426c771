//! static schema registry.
//!
//! schemas describe the field layout of each object kind and the element
//! kind of each array kind. they are registered once as process-lifetime
//! statics and never mutate; field indices are 1-based and stable, so a
//! sealed document stays readable across releases as long as existing
//! indices keep their meaning.

/// wire kind of a schema field or array element
#[derive(Clone, Copy)]
pub enum Kind {
    Int,
    Blob,
    Object(&'static ObjectSchema),
    Array(&'static ArraySchema),
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Int => "int",
            Kind::Blob => "blob",
            Kind::Object(_) => "object",
            Kind::Array(_) => "array",
        }
    }
}

/// one field of an object schema
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
}

/// field layout of one object kind
pub struct ObjectSchema {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl ObjectSchema {
    /// look up a field index by name; indices are 1-based
    pub fn field_index_by_name(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .map(|i| i + 1)
    }

    /// field descriptor for a 1-based index
    pub fn field(&self, index: usize) -> Option<&'static Field> {
        if index == 0 {
            return None;
        }
        self.fields.get(index - 1)
    }

    /// highest valid field index
    pub fn max_index(&self) -> usize {
        self.fields.len()
    }
}

/// element layout of one array kind
pub struct ArraySchema {
    pub name: &'static str,
    pub element: Kind,
}

/// root schema identifier stored in the document header
pub const ROOT_SCHEMA_PACKAGE: u32 = u32::from_le_bytes(*b"pkg\x01");

// package object (document root)
pub const PKG_PKGINFO: usize = 1;
pub const PKG_PATHS: usize = 2;
pub const PKG_SCRIPTS: usize = 3;
pub const PKG_TRIGGERS: usize = 4;
pub const PKG_REPLACES_PRIORITY: usize = 5;

// package info object
pub const PI_NAME: usize = 1;
pub const PI_VERSION: usize = 2;
pub const PI_HASHES: usize = 3;
pub const PI_ARCH: usize = 4;
pub const PI_DESCRIPTION: usize = 5;
pub const PI_LICENSE: usize = 6;
pub const PI_ORIGIN: usize = 7;
pub const PI_MAINTAINER: usize = 8;
pub const PI_URL: usize = 9;
pub const PI_BUILD_TIME: usize = 10;
pub const PI_INSTALLED_SIZE: usize = 11;
pub const PI_FILE_SIZE: usize = 12;
pub const PI_PROVIDES: usize = 13;
pub const PI_DEPENDS: usize = 14;

// directory object
pub const DI_NAME: usize = 1;
pub const DI_ACL: usize = 2;
pub const DI_FILES: usize = 3;

// file object
pub const FI_NAME: usize = 1;
pub const FI_ACL: usize = 2;
pub const FI_SIZE: usize = 3;
pub const FI_MTIME: usize = 4;
pub const FI_HASHES: usize = 5;
pub const FI_TARGET: usize = 6;

// acl object
pub const ACL_MODE: usize = 1;
pub const ACL_USER: usize = 2;
pub const ACL_GROUP: usize = 3;
pub const ACL_XATTRS: usize = 4;

// scripts object
pub const SCRPT_PRE_INSTALL: usize = 1;
pub const SCRPT_POST_INSTALL: usize = 2;
pub const SCRPT_PRE_DEINSTALL: usize = 3;
pub const SCRPT_POST_DEINSTALL: usize = 4;
pub const SCRPT_PRE_UPGRADE: usize = 5;
pub const SCRPT_POST_UPGRADE: usize = 6;
pub const SCRPT_TRIGGER: usize = 7;

pub static SCHEMA_XATTR_ARRAY: ArraySchema = ArraySchema {
    name: "xattr-array",
    element: Kind::Blob,
};

pub static SCHEMA_STRING_ARRAY: ArraySchema = ArraySchema {
    name: "string-array",
    element: Kind::Blob,
};

pub static SCHEMA_ACL: ObjectSchema = ObjectSchema {
    name: "acl",
    fields: &[
        Field { name: "mode", kind: Kind::Int },
        Field { name: "user", kind: Kind::Blob },
        Field { name: "group", kind: Kind::Blob },
        Field { name: "xattrs", kind: Kind::Array(&SCHEMA_XATTR_ARRAY) },
    ],
};

pub static SCHEMA_FILE: ObjectSchema = ObjectSchema {
    name: "file",
    fields: &[
        Field { name: "name", kind: Kind::Blob },
        Field { name: "acl", kind: Kind::Object(&SCHEMA_ACL) },
        Field { name: "size", kind: Kind::Int },
        Field { name: "mtime", kind: Kind::Int },
        Field { name: "hashes", kind: Kind::Blob },
        Field { name: "target", kind: Kind::Blob },
    ],
};

pub static SCHEMA_FILE_ARRAY: ArraySchema = ArraySchema {
    name: "file-array",
    element: Kind::Object(&SCHEMA_FILE),
};

pub static SCHEMA_DIR: ObjectSchema = ObjectSchema {
    name: "dir",
    fields: &[
        Field { name: "name", kind: Kind::Blob },
        Field { name: "acl", kind: Kind::Object(&SCHEMA_ACL) },
        Field { name: "files", kind: Kind::Array(&SCHEMA_FILE_ARRAY) },
    ],
};

pub static SCHEMA_DIR_ARRAY: ArraySchema = ArraySchema {
    name: "dir-array",
    element: Kind::Object(&SCHEMA_DIR),
};

pub static SCHEMA_SCRIPTS: ObjectSchema = ObjectSchema {
    name: "scripts",
    fields: &[
        Field { name: "pre-install", kind: Kind::Blob },
        Field { name: "post-install", kind: Kind::Blob },
        Field { name: "pre-deinstall", kind: Kind::Blob },
        Field { name: "post-deinstall", kind: Kind::Blob },
        Field { name: "pre-upgrade", kind: Kind::Blob },
        Field { name: "post-upgrade", kind: Kind::Blob },
        Field { name: "trigger", kind: Kind::Blob },
    ],
};

pub static SCHEMA_PKGINFO: ObjectSchema = ObjectSchema {
    name: "pkginfo",
    fields: &[
        Field { name: "name", kind: Kind::Blob },
        Field { name: "version", kind: Kind::Blob },
        Field { name: "hashes", kind: Kind::Blob },
        Field { name: "arch", kind: Kind::Blob },
        Field { name: "description", kind: Kind::Blob },
        Field { name: "license", kind: Kind::Blob },
        Field { name: "origin", kind: Kind::Blob },
        Field { name: "maintainer", kind: Kind::Blob },
        Field { name: "url", kind: Kind::Blob },
        Field { name: "build-time", kind: Kind::Int },
        Field { name: "installed-size", kind: Kind::Int },
        Field { name: "file-size", kind: Kind::Int },
        Field { name: "provides", kind: Kind::Blob },
        Field { name: "depends", kind: Kind::Blob },
    ],
};

pub static SCHEMA_PACKAGE: ObjectSchema = ObjectSchema {
    name: "package",
    fields: &[
        Field { name: "pkginfo", kind: Kind::Object(&SCHEMA_PKGINFO) },
        Field { name: "paths", kind: Kind::Array(&SCHEMA_DIR_ARRAY) },
        Field { name: "scripts", kind: Kind::Object(&SCHEMA_SCRIPTS) },
        Field { name: "triggers", kind: Kind::Array(&SCHEMA_STRING_ARRAY) },
        Field { name: "replaces-priority", kind: Kind::Int },
    ],
};
