//! Document loading from a directory tree or an explicit file list

use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::{Document, FileType};

use super::parser::FileParser;

/// Reads `.pdf` and `.docx` files into [`Document`]s
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load documents from `input_files`, or else every supported file under `input_dir`
    ///
    /// At least one source must be given. Explicit files take precedence when
    /// both are. Files with other extensions are skipped. Returns one
    /// document per file, in path order for directories and argument order
    /// for explicit files.
    pub fn load(
        &self,
        input_dir: Option<&Path>,
        input_files: Option<&[PathBuf]>,
    ) -> Result<Vec<Document>> {
        let paths = match (input_files, input_dir) {
            (Some(files), _) => Self::explicit_files(files)?,
            (None, Some(dir)) => Self::discover(dir)?,
            (None, None) => {
                return Err(Error::invalid_input(
                    "either an input directory or a list of input files is required",
                ))
            }
        };

        let start = Instant::now();
        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            documents.push(Self::load_file(path)?);
        }

        tracing::info!(
            "Loaded {} documents in {:.2}s",
            documents.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(documents)
    }

    /// Read and parse a single supported file
    pub fn load_file(path: &Path) -> Result<Document> {
        let file_type = FileType::from_path(path);
        if !file_type.is_supported() {
            return Err(Error::UnsupportedFileType(path.display().to_string()));
        }

        let data = std::fs::read(path)?;
        let pages = FileParser::parse(path, &data)?;
        let document = Document::new(path.to_path_buf(), file_type, pages, data.len() as u64);

        tracing::debug!(
            "Loaded {} ({} pages, {} bytes of text)",
            document.filename,
            document.pages.len(),
            document.text.len()
        );

        Ok(document)
    }

    fn explicit_files(files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(files.len());
        for file in files {
            if !file.is_file() {
                return Err(Error::invalid_input(format!(
                    "input file does not exist: {}",
                    file.display()
                )));
            }
            if FileType::from_path(file).is_supported() {
                paths.push(file.clone());
            } else {
                tracing::warn!("Skipping unsupported file: {}", file.display());
            }
        }
        Ok(paths)
    }

    fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(Error::invalid_input(format!(
                "input directory does not exist: {}",
                dir.display()
            )));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if FileType::from_path(entry.path()).is_supported() {
                paths.push(entry.into_path());
            } else {
                tracing::debug!("Skipping unsupported file: {}", entry.path().display());
            }
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Hyperlink, HyperlinkType, Paragraph, Run, Table, TableCell, TableRow};

    fn write_docx(path: &Path, docx: Docx) {
        let file = std::fs::File::create(path).unwrap();
        docx.build().pack(file).unwrap();
    }

    fn paragraph(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    #[test]
    fn test_requires_a_source() {
        let result = DocumentLoader::new().load(None, None);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_missing_directory() {
        let result = DocumentLoader::new().load(Some(Path::new("/nonexistent/docqa/dir")), None);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_unsupported_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "plain text").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("data.csv"), "a,b").unwrap();

        let docs = DocumentLoader::new().load(Some(dir.path()), None).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_explicit_files_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "plain text").unwrap();

        let docs = DocumentLoader::new()
            .load(Some(Path::new("/nonexistent/docqa/dir")), Some(std::slice::from_ref(&txt)))
            .unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_docx_tables_and_links_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.docx");
        let table = Table::new(vec![TableRow::new(vec![
            TableCell::new().add_paragraph(paragraph("Deductible is 500 dollars."))
        ])]);
        let link = Hyperlink::new("https://claims.example.com", HyperlinkType::External)
            .add_run(Run::new().add_text("Claims portal"));
        write_docx(
            &path,
            Docx::new()
                .add_paragraph(paragraph("Intro paragraph."))
                .add_table(table)
                .add_paragraph(Paragraph::new().add_hyperlink(link)),
        );

        let docs = DocumentLoader::new().load(None, Some(std::slice::from_ref(&path))).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_type, FileType::Docx);
        assert_eq!(docs[0].pages.len(), 1);
        assert_eq!(docs[0].pages[0].page_number, None);

        let text = &docs[0].text;
        assert!(text.contains("Intro paragraph."));
        assert!(text.contains("Deductible is 500 dollars."));
        assert!(text.contains("Claims portal"));
        assert!(text.find("Intro").unwrap() < text.find("Deductible").unwrap());
    }

    #[test]
    fn test_directory_yields_one_document_per_supported_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write_docx(&dir.path().join("b.docx"), Docx::new().add_paragraph(paragraph("Second.")));
        write_docx(
            &dir.path().join("nested").join("a.docx"),
            Docx::new().add_paragraph(paragraph("Nested.")),
        );
        std::fs::write(dir.path().join("notes.txt"), "plain text").unwrap();
        std::fs::write(dir.path().join("nested").join("data.csv"), "a,b").unwrap();

        let docs = DocumentLoader::new().load(Some(dir.path()), None).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["b.docx", "a.docx"]);
        assert!(docs[1].text.contains("Nested."));
    }
}
