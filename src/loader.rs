//! # Document loader
//!
//! Reads every supported file below a data folder into [`Document`]s.
//!
//! | Extension | Documents produced                                   |
//! |-----------|------------------------------------------------------|
//! | `.txt`    | one per file                                         |
//! | `.csv`    | one per data row, rendered as `header: value` lines  |
//! | `.pdf`    | one per page with extractable text                   |
//!
//! Files are visited in sorted path order so repeated loads of the same folder produce
//! the same document sequence. A file that cannot be parsed is skipped with a warning.

use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lopdf::Document as PdfDocument;
use tracing::{debug, info, warn};

use crate::document::{Document, PageContent, SourceMetadata};

/// File types accepted for upload and ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Txt,
    Csv,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::Pdf, FileKind::Txt, FileKind::Csv];

    /// Classify by the last extension, case-insensitively.
    ///
    /// ```rust
    /// use rag_llm::loader::FileKind;
    ///
    /// assert_eq!(FileKind::from_file_name("Report.PDF"), Some(FileKind::Pdf));
    /// assert_eq!(FileKind::from_file_name("notes.tar.txt"), Some(FileKind::Txt));
    /// assert_eq!(FileKind::from_file_name("setup.exe"), None);
    /// ```
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileKind::Pdf),
            "txt" => Some(FileKind::Txt),
            "csv" => Some(FileKind::Csv),
            _ => None,
        }
    }

    /// Sub-folder of the data directory that holds files of this kind.
    pub fn subfolder(self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf_files",
            FileKind::Txt => "txt_files",
            FileKind::Csv => "csv_files",
        }
    }
}

/// Load every supported file below `dir`. A missing directory yields no documents.
pub fn load_all_documents(dir: &Path) -> Result<Vec<Document>, Box<dyn Error>> {
    if !dir.exists() {
        warn!("Data directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let mut documents = Vec::new();
    for path in files {
        let Some(kind) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(FileKind::from_file_name)
        else {
            debug!("Ignoring unsupported file {}", path.display());
            continue;
        };
        match load_file(&path, kind) {
            Ok(docs) => {
                debug!("Loaded {} documents from {}", docs.len(), path.display());
                documents.extend(docs);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    info!("Loaded {} documents from {}", documents.len(), dir.display());
    Ok(documents)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

fn load_file(path: &Path, kind: FileKind) -> Result<Vec<Document>, Box<dyn Error>> {
    match kind {
        FileKind::Txt => load_text(path),
        FileKind::Csv => load_csv(path),
        FileKind::Pdf => load_pdf(path),
    }
}

fn source_of(path: &Path) -> String {
    path.display().to_string()
}

fn load_text(path: &Path) -> Result<Vec<Document>, Box<dyn Error>> {
    let bytes = fs::read(path)?;
    let content = match String::from_utf8(bytes) {
        Ok(text) => PageContent::Text(text),
        Err(e) => PageContent::Binary(e.into_bytes()),
    };
    Ok(vec![Document {
        content,
        metadata: SourceMetadata::new(source_of(path)),
    }])
}

fn load_csv(path: &Path) -> Result<Vec<Document>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let text = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| format!("{header}: {value}"))
            .collect::<Vec<_>>()
            .join("\n");
        documents.push(Document {
            content: PageContent::Text(text),
            metadata: SourceMetadata {
                row: Some(row as u64),
                ..SourceMetadata::new(source_of(path))
            },
        });
    }
    Ok(documents)
}

fn load_pdf(path: &Path) -> Result<Vec<Document>, Box<dyn Error>> {
    let pdf = PdfDocument::load(path)?;

    let mut documents = Vec::new();
    for page in pdf.get_pages().into_keys() {
        match pdf.extract_text(&[page]) {
            Ok(text) => documents.push(Document {
                content: PageContent::Text(text),
                metadata: SourceMetadata {
                    page: Some(page),
                    ..SourceMetadata::new(source_of(path))
                },
            }),
            Err(e) => warn!("No text on page {} of {}: {}", page, path.display(), e),
        }
    }
    Ok(documents)
}
