use crate::language::{
    ast::{Declaration, Program, QualifiedName, SourceFile},
    errors::SyntaxError,
    parser::parse_source_file,
    span::FileId,
};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

pub const SOURCE_EXTENSION: &str = "hds";

/// Source text of one loaded file, indexed by its `FileId`.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub path: PathBuf,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct LoadedProgram {
    pub program: Program,
    pub sources: Vec<SourceText>,
}

impl LoadedProgram {
    pub fn source(&self, file: FileId) -> Option<&SourceText> {
        self.sources.get(file.index())
    }
}

#[derive(Debug)]
pub struct FileErrors {
    pub path: PathBuf,
    pub source: String,
    pub errors: Vec<SyntaxError>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {error}", path.display())]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("syntax errors in {} file(s)", .0.len())]
    Syntax(Vec<FileErrors>),
}

/// Loads `entry` and every module it imports, transitively. Module
/// `a.b.c` lives at `<root>/a/b/c.hds`, where `<root>` is the directory
/// containing the entry file. Imports with no matching file are left for
/// the checker to report.
pub fn load_program(entry: &Path) -> Result<LoadedProgram, LoadError> {
    let root = entry
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let entry_module = entry
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("main");
    let mut loader = ModuleLoader::new(root);
    loader.load_module(QualifiedName::new([entry_module]), entry.to_path_buf())?;

    if !loader.file_errors.is_empty() {
        return Err(LoadError::Syntax(loader.file_errors));
    }
    debug!(files = loader.sources.len(), "program loaded");
    Ok(LoadedProgram {
        program: Program {
            files: loader.files,
        },
        sources: loader.sources,
    })
}

struct ModuleLoader {
    root: PathBuf,
    visited: HashSet<QualifiedName>,
    files: Vec<SourceFile>,
    sources: Vec<SourceText>,
    file_errors: Vec<FileErrors>,
}

impl ModuleLoader {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            visited: HashSet::new(),
            files: Vec::new(),
            sources: Vec::new(),
            file_errors: Vec::new(),
        }
    }

    fn load_module(&mut self, module: QualifiedName, path: PathBuf) -> Result<(), LoadError> {
        if !self.visited.insert(module.clone()) {
            return Ok(());
        }
        let source = fs::read_to_string(&path).map_err(|error| LoadError::Io {
            path: path.clone(),
            error,
        })?;
        debug!(%module, path = %path.display(), "loading module");

        let id = FileId(self.sources.len() as u32);
        self.sources.push(SourceText {
            path: path.clone(),
            source: source.clone(),
        });
        match parse_source_file(id, module, path.clone(), &source) {
            Ok(file) => {
                let imports: Vec<QualifiedName> = file
                    .declarations
                    .iter()
                    .filter_map(|declaration| match declaration {
                        Declaration::ImportAs(import) => Some(import.module_path.to_qualified_name()),
                        _ => None,
                    })
                    .collect();
                self.files.push(file);
                for import in imports {
                    let import_path = self.module_path(&import);
                    if !import_path.is_file() {
                        debug!(module = %import, path = %import_path.display(), "import has no source file");
                        continue;
                    }
                    self.load_module(import, import_path)?;
                }
            }
            Err(errors) => {
                self.file_errors.push(FileErrors {
                    path,
                    source,
                    errors: errors.errors,
                });
            }
        }
        Ok(())
    }

    fn module_path(&self, module: &QualifiedName) -> PathBuf {
        let mut path = self.root.clone();
        for segment in &module.0 {
            path.push(segment);
        }
        path.set_extension(SOURCE_EXTENSION);
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("hadesc-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("lib")).expect("create scratch dir");
        dir
    }

    #[test]
    fn imports_are_loaded_relative_to_the_entry() {
        let dir = scratch_dir("imports");
        fs::write(
            dir.join("main.hds"),
            "import lib.math as math;\nimport lib.gone as gone;\ndef main(): CInt { return math.two; }\n",
        )
        .expect("write main");
        fs::write(dir.join("lib").join("math.hds"), "const two = 2;\n").expect("write lib");

        let loaded = load_program(&dir.join("main.hds")).expect("load");
        let modules: Vec<String> = loaded
            .program
            .files
            .iter()
            .map(|file| file.module.to_string())
            .collect();
        assert_eq!(modules, vec!["main", "lib.math"]);
        assert_eq!(
            loaded.source(FileId(1)).map(|text| text.source.as_str()),
            Some("const two = 2;\n")
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn syntax_errors_are_collected_per_file() {
        let dir = scratch_dir("syntax");
        fs::write(dir.join("main.hds"), "import lib.bad as bad;\n").expect("write main");
        fs::write(dir.join("lib").join("bad.hds"), "def (: Void {}\n").expect("write lib");

        match load_program(&dir.join("main.hds")) {
            Err(LoadError::Syntax(files)) => {
                assert_eq!(files.len(), 1);
                assert!(files[0].path.ends_with("lib/bad.hds"));
            }
            other => panic!("expected syntax errors, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_entry_is_an_io_error() {
        assert!(matches!(
            load_program(Path::new("/nonexistent/hadesc/main.hds")),
            Err(LoadError::Io { .. })
        ));
    }
}
