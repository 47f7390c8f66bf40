//! `CompileOptions`: a plain builder, not an external config-file format —
//! the source language has no project-level config of its own (§10).

use styl_eval::{HostFunction, HostRegistry};

pub struct CompileOptions {
    pub(crate) filename: String,
    pub(crate) compress: bool,
    pub(crate) paths: Vec<String>,
    pub(crate) imports: Vec<String>,
    pub(crate) functions: HostRegistry,
    pub(crate) warn: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn with_import(mut self, path: impl Into<String>) -> Self {
        self.imports.push(path.into());
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, function: HostFunction) -> Self {
        self.functions.register(name, function);
        self
    }

    pub fn with_warn(mut self, warn: bool) -> Self {
        self.warn = warn;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            filename: "<anonymous>".to_string(),
            compress: false,
            paths: Vec::new(),
            imports: Vec::new(),
            functions: HostRegistry::new(),
            warn: false,
        }
    }
}
