use cinder_build::Config;
use cinder_codegen::Program;
use cinder_common::{SourceFile, SourceMap, SymbolInterner};
use cinder_frontend::Token;
use cinder_hir::Module;
use cinder_runtime::Vm;
use cinder_sema::Analysis;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::Path;

/// A module that passed semantic analysis.
#[derive(Debug)]
pub struct CheckedModule {
    pub module: Module,
    pub analysis: Analysis,
}

/// Compiler driver that orchestrates the compilation pipeline.
///
/// Each stage runs the stages before it, so `run_file` tokenizes, parses,
/// checks, compiles and executes. Files are read once and kept in the
/// source map; the `*_source` variants take text directly.
pub struct Driver {
    config: Config,
    source_map: SourceMap,
    interner: SymbolInterner,
}

impl Driver {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            source_map: SourceMap::new(),
            interner: SymbolInterner::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read a source file from disk, or return it if already loaded.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<SourceFile> {
        let path = path.as_ref();
        if let Some(source) = self.source_map.get_by_path(path) {
            return Ok(source);
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))?;
        self.add_source(path, content)
    }

    /// Register in-memory source text under `path`.
    pub fn add_source(&self, path: impl AsRef<Path>, content: impl Into<String>) -> Result<SourceFile> {
        let id = self.source_map.add_file(path, content.into())?;
        self.source_map
            .get(id)
            .ok_or_else(|| miette::miette!("Source file not found"))
    }

    pub fn tokens(&self, path: impl AsRef<Path>) -> Result<Vec<Token>> {
        cinder_frontend::tokenize(&self.load(path)?)
    }

    /// Parse a single source file.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Module> {
        self.parse(&self.load(path)?)
    }

    /// Parse and check a single source file.
    pub fn check_file(&self, path: impl AsRef<Path>) -> Result<CheckedModule> {
        self.check(&self.load(path)?)
    }

    /// Compile a source file to an instruction listing.
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<Program> {
        self.compile(&self.load(path)?)
    }

    /// Compile and execute a source file, returning the entry function's value.
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<i32> {
        self.run(&self.load(path)?)
    }

    pub fn check_source(&self, path: impl AsRef<Path>, content: impl Into<String>) -> Result<CheckedModule> {
        self.check(&self.add_source(path, content)?)
    }

    pub fn compile_source(&self, path: impl AsRef<Path>, content: impl Into<String>) -> Result<Program> {
        self.compile(&self.add_source(path, content)?)
    }

    pub fn run_source(&self, path: impl AsRef<Path>, content: impl Into<String>) -> Result<i32> {
        self.run(&self.add_source(path, content)?)
    }

    fn parse(&self, source: &SourceFile) -> Result<Module> {
        cinder_frontend::parse_file(source, &self.interner)
    }

    fn check(&self, source: &SourceFile) -> Result<CheckedModule> {
        let mut module = self.parse(source)?;
        let analysis = cinder_sema::analyze(&mut module, &self.interner, source, &self.config.compiler.entry)?;
        log::debug!(
            "checked {}: {} global(s), {} function(s)",
            source.path.display(),
            analysis.globals.len(),
            analysis.functions.len()
        );
        Ok(CheckedModule { module, analysis })
    }

    fn compile(&self, source: &SourceFile) -> Result<Program> {
        let checked = self.check(source)?;
        cinder_codegen::compile_module(&checked.module, &self.interner)
    }

    fn run(&self, source: &SourceFile) -> Result<i32> {
        let program = self.compile(source)?;
        let entry = &self.config.compiler.entry;
        let mut vm = Vm::new(&program, self.config.vm_options());
        let exit = vm
            .run(entry)
            .into_diagnostic()
            .wrap_err_with(|| format!("while running {}", source.path.display()))?;
        log::debug!("{}: exit {}", source.path.display(), exit);
        Ok(exit)
    }

    /// Get a reference to the symbol interner.
    pub fn interner(&self) -> &SymbolInterner {
        &self.interner
    }

    /// Get a reference to the source map.
    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_runtime::OverflowPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_cpp(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".cpp").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_run_file_from_disk() {
        let file = temp_cpp("int main() { int x = 3; return x * 7; }");
        let driver = Driver::default();
        assert_eq!(driver.run_file(file.path()).unwrap(), 21);
        // Second use comes from the source map
        assert!(driver.check_file(file.path()).is_ok());
        assert_eq!(driver.source_map().len(), 1);
    }

    #[test]
    fn test_fixture_matches_native_routine() {
        let driver = Driver::default();
        let native = cinder_fixture::run().unwrap();
        let compiled = driver.run_source("input.cpp", cinder_fixture::SOURCE).unwrap();
        assert_eq!(compiled, native);
        assert_eq!(compiled, cinder_fixture::EXPECTED_EXIT);
    }

    #[test]
    fn test_fixture_analysis() {
        let driver = Driver::default();
        let checked = driver.check_source("input.cpp", cinder_fixture::SOURCE).unwrap();
        let names: Vec<String> = checked
            .analysis
            .globals
            .keys()
            .map(|sym| driver.interner().resolve(*sym).to_string())
            .collect();
        assert_eq!(names, vec!["globalVar", "globalFlag"]);
    }

    #[test]
    fn test_tokens() {
        let file = temp_cpp("int a = 5;");
        let tokens = Driver::default().tokens(file.path()).unwrap();
        let text: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(text, vec!["int", "a", "=", "5", ";"]);
    }

    #[test]
    fn test_errors_are_reported() {
        let driver = Driver::default();
        let err = driver.check_source("bad.cpp", "int main() { return x; }").unwrap_err();
        assert!(err.to_string().contains("semantic analysis failed"), "{err}");

        let err = driver.run_source("div.cpp", "int main() { int z = 0; return 1 / z; }").unwrap_err();
        assert!(
            err.chain().any(|e| e.to_string().contains("division by zero in 'main'")),
            "{err:?}"
        );

        assert!(driver.load("missing.cpp").is_err());
        assert!(driver.add_source("notes.txt", "int main() { return 0; }").is_err());
    }

    #[test]
    fn test_pow_is_left_associative() {
        let driver = Driver::default();
        assert_eq!(driver.run_source("chain.cpp", "int main() { return 2 ^ 3 ^ 2; }").unwrap(), 64);
        assert_eq!(driver.run_source("group.cpp", "int main() { return 2 ^ (3 ^ 2); }").unwrap(), 512);
    }

    #[test]
    fn test_config_is_applied() {
        let mut config = Config::default();
        config.compiler.entry = "start".into();
        config.runtime.overflow = OverflowPolicy::Wrapping;
        let driver = Driver::new(config);
        let exit = driver
            .run_source("wrap.cpp", "int start() { int big = 2147483647; return big + 2; }")
            .unwrap();
        assert_eq!(exit, i32::MIN + 1);
    }
}
