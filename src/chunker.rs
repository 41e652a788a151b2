//! Novel text chunking
//!
//! Turns the plain text of a novel into an ordered sequence of chunk
//! rows: one row per paragraph, grouped under the chapter heading it
//! falls under. Project Gutenberg boilerplate is stripped when present.

use crate::pipeline::ChunkRow;
use regex_lite::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn start_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*\*\* START OF THE PROJECT GUTENBERG EBOOK [^*]+\*\*\*")
            .expect("static pattern")
    })
}

fn end_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*\*\* END OF THE PROJECT GUTENBERG EBOOK [^*]+\*\*\*")
            .expect("static pattern")
    })
}

fn chapter_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^CHAPTER [IVXLCDM]+\.").expect("static pattern"))
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n+").expect("static pattern"))
}

/// Drop everything outside the Project Gutenberg start/end markers.
fn strip_gutenberg(text: &str) -> &str {
    let mut text = text;
    if let Some(m) = start_marker().find(text) {
        text = &text[m.end()..];
    }
    if let Some(m) = end_marker().find(text) {
        text = &text[..m.start()];
    }
    text.trim()
}

struct RowBuilder {
    author: String,
    book: String,
    order: i64,
    rows: Vec<ChunkRow>,
}

impl RowBuilder {
    fn push_paragraphs(&mut self, chapter: &str, body: &str) {
        for paragraph in paragraph_break().split(body) {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            self.order += 1;
            self.rows.push(ChunkRow {
                chapter: chapter.to_string(),
                chunk: paragraph.to_string(),
                chunk_order_number: self.order,
                author: self.author.clone(),
                book: self.book.clone(),
                kg_json: String::new(),
            });
        }
    }
}

/// Split novel text into ordered chunk rows.
///
/// Chapter headings are lines starting `CHAPTER <roman numeral>.`; text
/// before the first heading lands under `"Preamble"`, and a text with no
/// headings at all lands under `"Unknown"`. `chunk_order_number` is a
/// global 1-based counter across the whole novel. The `kg_json` field is
/// left empty for the extraction step to fill.
pub fn chunk_novel(novel_text: &str, author: &str, book: &str) -> Vec<ChunkRow> {
    let text = strip_gutenberg(novel_text);
    let mut builder = RowBuilder {
        author: author.to_string(),
        book: book.to_string(),
        order: 0,
        rows: Vec::new(),
    };

    let headings: Vec<_> = chapter_heading().find_iter(text).collect();
    if headings.is_empty() {
        builder.push_paragraphs("Unknown", text);
        return builder.rows;
    }

    let preamble = text[..headings[0].start()].trim();
    if !preamble.is_empty() {
        builder.push_paragraphs("Preamble", preamble);
    }

    for (i, heading) in headings.iter().enumerate() {
        let body_end = headings
            .get(i + 1)
            .map(|next| next.start())
            .unwrap_or(text.len());
        let body = text[heading.end()..body_end].trim();
        builder.push_paragraphs(heading.as_str(), body);
    }

    builder.rows
}

/// Read a novel from disk and chunk it.
pub fn chunk_novel_file(
    path: impl AsRef<Path>,
    author: &str,
    book: &str,
) -> std::io::Result<Vec<ChunkRow>> {
    let text = std::fs::read_to_string(path)?;
    Ok(chunk_novel(&text, author, book))
}
