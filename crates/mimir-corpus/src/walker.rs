use std::path::{Path, PathBuf};

use mimir_core::MimirError;

/// Maximum file size to process (1 MB).
const MAX_FILE_SIZE: u64 = 1_048_576;

/// Number of bytes to check for binary detection.
const BINARY_CHECK_SIZE: usize = 8192;

/// A source file discovered during corpus walking.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use mimir_corpus::walker::{CorpusFile, FileKind};
///
/// let file = CorpusFile {
///     path: PathBuf::from("Source/Pawn.cs"),
///     kind: FileKind::CSharp,
///     content: "class Pawn { }".to_string(),
/// };
/// assert_eq!(file.kind, FileKind::CSharp);
/// ```
#[derive(Debug, Clone)]
pub struct CorpusFile {
    /// Path relative to the corpus root.
    pub path: PathBuf,
    /// Detected file kind.
    pub kind: FileKind,
    /// Full file content.
    pub content: String,
}

/// File kind detected from the extension.
///
/// # Examples
///
/// ```
/// use mimir_corpus::walker::FileKind;
///
/// assert_eq!(FileKind::from_extension("cs"), FileKind::CSharp);
/// assert_eq!(FileKind::from_extension("xml"), FileKind::Xml);
/// assert_eq!(FileKind::from_extension("txt"), FileKind::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// C# source (`.cs`).
    CSharp,
    /// XML data definitions (`.xml`).
    Xml,
    /// Anything else; skipped by the walker.
    Unknown,
}

impl FileKind {
    /// Detect the file kind from an extension string (without the dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "cs" => FileKind::CSharp,
            "xml" => FileKind::Xml,
            _ => FileKind::Unknown,
        }
    }
}

/// Walk a mod corpus, respecting `.gitignore`, returning parseable files.
///
/// Skips binary files, files larger than 1 MB, and files with unknown
/// extensions. Returned paths are relative to `root`.
///
/// # Errors
///
/// Returns [`MimirError::Io`] if the root directory cannot be read.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use mimir_corpus::walker::walk_corpus;
///
/// let files = walk_corpus(Path::new("Mods/MyMod")).unwrap();
/// for f in &files {
///     println!("{}: {:?}", f.path.display(), f.kind);
/// }
/// ```
pub fn walk_corpus(root: &Path) -> Result<Vec<CorpusFile>, MimirError> {
    if !root.exists() {
        return Err(MimirError::FileNotFound(root.to_path_buf()));
    }

    let walker = ignore::WalkBuilder::new(root).build();
    let mut files = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(_) => continue,
        };
        if metadata.len() > MAX_FILE_SIZE {
            continue;
        }

        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e,
            None => continue,
        };
        let kind = FileKind::from_extension(ext);
        if kind == FileKind::Unknown {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => continue,
        };

        // Null bytes in the first 8KB mean a mislabeled binary file
        let check_len = content.len().min(BINARY_CHECK_SIZE);
        if content.as_bytes()[..check_len].contains(&0) {
            continue;
        }

        let relative = match path.strip_prefix(root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => path.to_path_buf(),
        };

        files.push(CorpusFile {
            path: relative,
            kind,
            content,
        });
    }

    // The walker's traversal order depends on directory enumeration; node
    // indices downstream are assigned in chunk order, so pin it here.
    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(files)
}
