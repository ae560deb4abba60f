
use itertools::Itertools;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::crawler::{Document, prune_text};
use crate::{QaError, Result};

pub const EMBEDDINGS_HEADER: &str = "Title,Content,Embedding";
pub const ARTICLES_HEADER: &str = "Title,URL,Content";

const COLUMN_DELIMITER: char = ',';
/// Separator between the components of a serialized embedding
pub const VECTOR_DELIMITER: &str = "|";

/// One embedded chunk as persisted in the store
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub title: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Delimited-text file of embedded chunks, read and written as a whole
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    path: PathBuf,
}

impl EmbeddingStore {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the store with `records`.
    ///
    /// Nothing is written unless every record is valid, and the previous file
    /// stays in place until the new one is complete.
    #[inline]
    pub fn save(&self, records: &[EmbeddingRecord]) -> Result<()> {
        let first = records
            .first()
            .ok_or_else(|| QaError::EmptyInput("no embedding records to save".to_string()))?;
        let dimension = first.embedding.len();

        let mut content = String::from(EMBEDDINGS_HEADER);
        content.push('\n');

        for (index, record) in records.iter().enumerate() {
            if record.embedding.is_empty() || record.embedding.len() != dimension {
                return Err(QaError::Format(format!(
                    "record {} ('{}') has dimension {}, expected {}",
                    index,
                    record.title,
                    record.embedding.len(),
                    dimension
                )));
            }
            if record.embedding.iter().any(|value| !value.is_finite()) {
                return Err(QaError::Format(format!(
                    "record {} ('{}') has a non-finite embedding component",
                    index, record.title
                )));
            }

            content.push_str(&prune_text(&record.title));
            content.push(COLUMN_DELIMITER);
            content.push_str(&prune_text(&record.content));
            content.push(COLUMN_DELIMITER);
            content.push_str(&record.embedding.iter().join(VECTOR_DELIMITER));
            content.push('\n');
        }

        write_atomic(&self.path, &content)?;

        info!(
            "Saved {} embedding records ({} dimensions) to {}",
            records.len(),
            dimension,
            self.path.display()
        );
        Ok(())
    }

    /// Read every record back
    #[inline]
    pub fn load(&self) -> Result<Vec<EmbeddingRecord>> {
        let content = read_table(&self.path, "embedding store")?;
        let rows = data_rows(&content, &self.path, EMBEDDINGS_HEADER)?;

        let mut records = Vec::new();
        let mut dimension = None;

        for (line_number, line) in rows {
            let columns: Vec<&str> = line.split(COLUMN_DELIMITER).collect();
            let [title, text, embedding] = columns.as_slice() else {
                return Err(row_error(
                    &self.path,
                    line_number,
                    &format!("expected 3 columns, found {}", columns.len()),
                ));
            };

            let embedding = parse_embedding(embedding)
                .map_err(|message| row_error(&self.path, line_number, &message))?;

            match dimension {
                None => dimension = Some(embedding.len()),
                Some(expected) if expected != embedding.len() => {
                    return Err(row_error(
                        &self.path,
                        line_number,
                        &format!(
                            "embedding has {} dimensions, expected {}",
                            embedding.len(),
                            expected
                        ),
                    ));
                }
                Some(_) => {}
            }

            records.push(EmbeddingRecord {
                title: (*title).to_string(),
                content: (*text).to_string(),
                embedding,
            });
        }

        if records.is_empty() {
            return Err(QaError::Format(format!(
                "{}: embedding store has no records",
                self.path.display()
            )));
        }

        debug!(
            "Loaded {} embedding records from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// Write scraped documents as a `Title,URL,Content` table
#[inline]
pub fn write_documents(path: &Path, documents: &[Document]) -> Result<()> {
    let mut content = String::from(ARTICLES_HEADER);
    content.push('\n');

    for document in documents {
        content.push_str(&prune_text(&document.title));
        content.push(COLUMN_DELIMITER);
        content.push_str(&prune_text(&document.url));
        content.push(COLUMN_DELIMITER);
        content.push_str(&prune_text(&document.content));
        content.push('\n');
    }

    write_atomic(path, &content)?;

    info!("Saved {} articles to {}", documents.len(), path.display());
    Ok(())
}

/// Read a `Title,URL,Content` table, skipping rows without content
#[inline]
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let content = read_table(path, "article table")?;
    let rows = data_rows(&content, path, ARTICLES_HEADER)?;

    let mut documents = Vec::new();
    for (line_number, line) in rows {
        let mut columns = line.splitn(3, COLUMN_DELIMITER);
        let title = columns.next().unwrap_or_default();
        let url = columns.next().unwrap_or_default();
        let content = columns.next().unwrap_or_default();

        if content.trim().is_empty() {
            debug!(
                "Skipping article on line {} without content: '{}'",
                line_number, title
            );
            continue;
        }

        documents.push(Document {
            title: title.to_string(),
            url: url.to_string(),
            content: content.to_string(),
        });
    }

    debug!("Read {} articles from {}", documents.len(), path.display());
    Ok(documents)
}

fn read_table(path: &Path, what: &str) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(QaError::Format(format!(
            "{} not found at {}",
            what,
            path.display()
        ))),
        Err(e) => Err(QaError::Io(e)),
    }
}

/// Check the header and yield the non-blank data rows with their 1-based line numbers
fn data_rows<'a>(
    content: &'a str,
    path: &Path,
    header: &str,
) -> Result<impl Iterator<Item = (usize, &'a str)>> {
    let mut lines = content.lines();
    let first = lines
        .next()
        .ok_or_else(|| QaError::Format(format!("{}: file is empty", path.display())))?;

    if first.trim_end() != header {
        return Err(QaError::Format(format!(
            "{}: expected header '{}', found '{}'",
            path.display(),
            header,
            first
        )));
    }

    Ok(lines
        .enumerate()
        .map(|(index, line)| (index + 2, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty()))
}

fn parse_embedding(column: &str) -> std::result::Result<Vec<f32>, String> {
    if column.trim().is_empty() {
        return Err("embedding column is empty".to_string());
    }

    column
        .split(VECTOR_DELIMITER)
        .enumerate()
        .map(|(index, component)| {
            component
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| {
                    format!(
                        "embedding component {} ('{}') is not a number",
                        index, component
                    )
                })
        })
        .collect()
}

fn row_error(path: &Path, line_number: usize, message: &str) -> QaError {
    QaError::Format(format!("{}:{}: {}", path.display(), line_number, message))
}

/// Write to a sibling temporary file and rename it over `path`
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, content)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(QaError::Io(e));
    }

    Ok(())
}
