use miette::NamedSource;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Unique identifier for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u32);

impl SourceId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }
}

/// Extensions accepted as C++ subset sources.
const SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "c++", "h", "hpp"];

pub fn is_source_extension(ext: &str) -> bool {
    SOURCE_EXTENSIONS.contains(&ext)
}

/// A source file with its contents.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub path: PathBuf,
    pub content: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    pub fn new(id: SourceId, path: PathBuf, content: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i as u32 + 1))
            .collect();

        Self {
            id,
            path,
            content,
            line_starts,
        }
    }

    /// Line and column (0-indexed) of a byte offset. The column counts
    /// characters, not bytes.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let start = self.line_starts[line];
        let col = self
            .content
            .get(start as usize..offset as usize)
            .map_or(offset - start, |prefix| prefix.chars().count() as u32);
        (line as u32, col)
    }

    /// Get the content of a specific line, without its newline.
    pub fn line(&self, line: u32) -> Option<&str> {
        let start = *self.line_starts.get(line as usize)? as usize;
        let end = self
            .line_starts
            .get(line as usize + 1)
            .map(|&e| e as usize)
            .unwrap_or(self.content.len());
        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Source text packaged for miette reports.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.path.display().to_string(), self.content.clone())
    }
}

/// Registry of all source files.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: RwLock<Vec<SourceFile>>,
    path_to_id: RwLock<FxHashMap<PathBuf, SourceId>>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: String) -> miette::Result<SourceId> {
        let path = path.as_ref().to_path_buf();

        let known = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(is_source_extension);
        if !known {
            return Err(miette::miette!(
                help = "expected one of: .cpp .cc .cxx .c++ .h .hpp",
                "Unknown file extension: {:?}",
                path
            ));
        }

        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        let mut path_to_id = self
            .path_to_id
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let id = SourceId(files.len() as u32);
        files.push(SourceFile::new(id, path.clone(), content));
        path_to_id.insert(path, id);

        Ok(id)
    }

    pub fn get(&self, id: SourceId) -> Option<SourceFile> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.get(id.0 as usize).cloned()
    }

    /// Latest file registered under `path`.
    pub fn get_by_path(&self, path: impl AsRef<Path>) -> Option<SourceFile> {
        let id = {
            let path_to_id = self.path_to_id.read().unwrap_or_else(PoisonError::into_inner);
            *path_to_id.get(path.as_ref())?
        };
        self.get(id)
    }

    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
