pub mod combo;
pub mod forwarders;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// A file produced by one of the generators, relative to the output root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<PathBuf>, contents: String) -> Self {
        GeneratedFile {
            path: path.into(),
            contents,
        }
    }
}

/// Writes `files` below `root`, creating directories as needed. Stops at the first failure.
pub fn write_files(root: &Path, files: &[GeneratedFile]) -> io::Result<()> {
    for file in files {
        let path = root.join(&file.path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, &file.contents)?;

        trace!(path = %path.display(), bytes = file.contents.len(), "wrote file");
    }

    Ok(())
}

pub(crate) struct CWriter {
    out: String,
    indent: usize,
}

impl CWriter {
    pub fn new() -> Self {
        CWriter {
            out: String::new(),
            indent: 0,
        }
    }

    pub fn line(&mut self, s: &str) {
        if !s.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    pub fn open_block(&mut self) {
        self.line("{");
        self.indent += 1;
    }

    pub fn close_block(&mut self) {
        self.close_block_with("}");
    }

    /// Closes a block with something other than a bare brace, e.g. `};` after an initializer.
    pub fn close_block_with(&mut self, s: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(s);
    }

    pub fn indented(&mut self, f: impl FnOnce(&mut CWriter)) {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    pub fn finish(self) -> String {
        self.out
    }
}
