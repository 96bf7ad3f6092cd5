//! Search result output: human-readable text, JSON, or JSON Lines.

use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Write};

use crate::types::{Score, SearchHit};

const SEPARATOR_WIDTH: usize = 50;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Numbered listing for terminals
    #[default]
    Text,
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

/// Writes search hits in the chosen format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects the JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write the hits for one query.
    pub fn write_hits(&mut self, query: &str, hits: &[SearchHit]) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                self.writer
                    .write_all(render_text(query, hits).as_bytes())?;
                self.items_written += hits.len();
            }
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, hits)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, hits).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += hits.len();
            }
            OutputFormat::JsonLines => {
                for hit in hits {
                    self.write_line(hit)?;
                }
            }
        }
        Ok(())
    }

    /// Write one item as a single JSON line.
    pub fn write_line<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Numbered listing of search hits.
///
/// Distance hits print on one line each; certainty hits print a block with
/// path, similarity and stored metadata between separator lines.
pub fn render_text(query: &str, hits: &[SearchHit]) -> String {
    let mut out = String::new();
    if hits.is_empty() {
        let _ = writeln!(out, "No similar images found for {query}");
        return out;
    }

    let separator = "-".repeat(SEPARATOR_WIDTH);
    let _ = writeln!(out, "\nFound {} similar images to {}:", hits.len(), query);
    let blocks = hits
        .iter()
        .any(|h| matches!(h.score, Score::Certainty(_)) || h.metadata.is_some());
    if blocks {
        let _ = writeln!(out, "{separator}");
    }

    for (i, hit) in hits.iter().enumerate() {
        if !blocks {
            let _ = writeln!(out, "{}. {} ({})", i + 1, hit.path, hit.score);
            continue;
        }

        let _ = writeln!(out, "{}. {}", i + 1, hit.filename);
        let _ = writeln!(out, "   Path: {}", hit.path);
        match hit.score {
            Score::Distance(d) => {
                let _ = writeln!(out, "   Distance: {d:.4}");
            }
            Score::Certainty(Some(c)) => {
                let _ = writeln!(out, "   Similarity: {c:.4}");
            }
            Score::Certainty(None) => {
                let _ = writeln!(out, "   Similarity: Not available");
            }
        }
        match hit.metadata.as_ref().filter(|m| !m.is_empty()) {
            Some(meta) => {
                if let (Some(w), Some(h)) = (meta.width, meta.height) {
                    let _ = writeln!(out, "   Dimensions: {w}x{h}");
                }
                if let Some(format) = &meta.format {
                    let _ = writeln!(out, "   Format: {format}");
                }
                if let Some(size) = meta.size_kb {
                    let _ = writeln!(out, "   Size: {size:.2} KB");
                }
            }
            None => {
                let _ = writeln!(out, "   Metadata: Not available");
            }
        }
        let _ = writeln!(out, "{separator}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HitMetadata, ImageMetadata};

    fn milvus_hit() -> SearchHit {
        SearchHit {
            filename: "cat.jpg".into(),
            path: "/photos/cat.jpg".into(),
            score: Score::Distance(0.875),
            metadata: None,
        }
    }

    fn weaviate_hit(metadata: bool) -> SearchHit {
        SearchHit {
            filename: "dog.png".into(),
            path: "pets/dog.png".into(),
            score: Score::Certainty(Some(0.5)),
            metadata: metadata.then(|| {
                ImageMetadata {
                    width: 640,
                    height: 480,
                    format: "png".into(),
                    size_kb: 12.25,
                }
                .into()
            }),
        }
    }

    #[test]
    fn test_text_distance_listing() {
        let text = render_text("query.jpg", &[milvus_hit()]);
        assert!(text.contains("Found 1 similar images to query.jpg:"));
        assert!(text.contains("1. /photos/cat.jpg (distance: 0.8750)"));
        assert!(!text.contains("-----"));
    }

    #[test]
    fn test_text_certainty_blocks() {
        let text = render_text("q.jpg", &[weaviate_hit(true), weaviate_hit(false)]);
        let separator = "-".repeat(50);
        assert_eq!(text.matches(&separator).count(), 3);
        assert!(text.contains("1. dog.png"));
        assert!(text.contains("   Path: pets/dog.png"));
        assert!(text.contains("   Similarity: 0.5000"));
        assert!(text.contains("   Dimensions: 640x480"));
        assert!(text.contains("   Format: png"));
        assert!(text.contains("   Size: 12.25 KB"));
        assert!(text.contains("   Metadata: Not available"));
    }

    #[test]
    fn test_text_empty() {
        assert_eq!(
            render_text("q.jpg", &[]),
            "No similar images found for q.jpg\n"
        );
    }

    #[test]
    fn test_write_json_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write_hits("q", &[milvus_hit(), weaviate_hit(true)]).unwrap();
        assert_eq!(writer.items_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        let parsed: Vec<SearchHit> = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed[0], milvus_hit());
    }

    #[test]
    fn test_write_jsonl() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, false);
        writer.write_hits("q", &[milvus_hit(), weaviate_hit(false)]).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"certainty\""));
    }

    #[test]
    fn test_text_partial_metadata() {
        let mut hit = weaviate_hit(false);
        hit.metadata = Some(HitMetadata {
            width: Some(640),
            format: Some("png".into()),
            size_kb: Some(3.0),
            ..HitMetadata::default()
        });
        let text = render_text("q.jpg", &[hit]);
        assert!(!text.contains("Dimensions"));
        assert!(text.contains("   Format: png"));
        assert!(text.contains("   Size: 3.00 KB"));
        assert!(!text.contains("Metadata: Not available"));
    }
}
