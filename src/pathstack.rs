use std::path::{Path, PathBuf};

/// incremental path used while descending a tree.
///
/// `push` records the current length in the returned token and `pop`
/// truncates back to it, so nesting exactly follows the recursion.
/// every push must be popped on every exit path, including early error
/// returns; the token is must-use to make a forgotten pop loud.
pub struct PathStack {
    buf: String,
}

/// truncation point returned by [`PathStack::push`]
#[must_use = "a pushed component must be popped on every exit path"]
#[derive(Debug, Clone, Copy)]
pub struct PathToken(usize);

impl PathStack {
    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    /// append a component, with a separator when not at the root
    pub fn push(&mut self, name: &str) -> PathToken {
        let token = PathToken(self.buf.len());
        if !self.buf.is_empty() {
            self.buf.push('/');
        }
        self.buf.push_str(name);
        token
    }

    /// truncate back to the state recorded by `token`
    pub fn pop(&mut self, token: PathToken) {
        debug_assert!(token.0 <= self.buf.len());
        self.buf.truncate(token.0);
    }

    /// replace the whole path (used by the fixup and emit passes, which
    /// revisit records out of recursion order)
    pub fn set(&mut self, path: &str) {
        self.buf.clear();
        self.buf.push_str(path);
    }

    /// current path
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// current path joined under a filesystem root
    pub fn under(&self, root: &Path) -> PathBuf {
        root.join(&self.buf)
    }
}

impl Default for PathStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_nesting() {
        let mut p = PathStack::new();
        let t1 = p.push("usr");
        assert_eq!(p.as_str(), "usr");
        let t2 = p.push("bin");
        assert_eq!(p.as_str(), "usr/bin");
        let t3 = p.push("env");
        assert_eq!(p.as_str(), "usr/bin/env");
        p.pop(t3);
        assert_eq!(p.as_str(), "usr/bin");
        p.pop(t2);
        assert_eq!(p.as_str(), "usr");
        p.pop(t1);
        assert_eq!(p.as_str(), "");
    }

    #[test]
    fn test_pop_restores_pre_push_value() {
        let mut p = PathStack::new();
        let _root = p.push("a");
        let before = p.as_str().to_string();
        let t = p.push("b");
        p.pop(t);
        assert_eq!(p.as_str(), before);
    }

    #[test]
    fn test_no_leading_separator() {
        let mut p = PathStack::new();
        let _t = p.push("etc");
        assert_eq!(p.as_str(), "etc");
    }

    #[test]
    fn test_set_replaces() {
        let mut p = PathStack::new();
        let _t = p.push("usr");
        p.set("var/log");
        assert_eq!(p.as_str(), "var/log");
        let t = p.push("messages");
        assert_eq!(p.as_str(), "var/log/messages");
        p.pop(t);
        assert_eq!(p.as_str(), "var/log");
    }

    #[test]
    fn test_under_root() {
        let mut p = PathStack::new();
        let _t = p.push("usr");
        let _t2 = p.push("lib");
        assert_eq!(p.under(Path::new("/src")), PathBuf::from("/src/usr/lib"));
    }
}
