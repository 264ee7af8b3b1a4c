
use std::fs;
use std::path::{Path, PathBuf};

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::{AssistantError, Result};

const BLOCK_TAGS: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "p",
    "li",
    "pre",
    "blockquote",
    "dt",
    "dd",
    "td",
    "th",
];

/// Plain text of a source file, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    #[inline]
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// File formats the loader knows how to flatten to text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Html,
}

impl DocumentFormat {
    /// Guess the format from the file extension
    #[inline]
    pub fn from_path(path: &Path) -> Option<Self> {
        let Some(extension) = path.extension() else {
            return Some(Self::PlainText);
        };
        match extension.to_string_lossy().to_lowercase().as_str() {
            "txt" | "text" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

/// Load a file and flatten it to plain text
#[inline]
pub fn load_document(path: &Path) -> Result<Document> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| AssistantError::Document {
        path: path.to_path_buf(),
        message: "unsupported file format".to_string(),
    })?;

    let raw = fs::read_to_string(path).map_err(|e| AssistantError::Document {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let text = match format {
        DocumentFormat::PlainText => raw,
        DocumentFormat::Markdown => markdown_to_text(&raw),
        DocumentFormat::Html => html_to_text(&raw).map_err(|message| AssistantError::Document {
            path: path.to_path_buf(),
            message,
        })?,
    };

    if text.trim().is_empty() {
        return Err(AssistantError::Document {
            path: path.to_path_buf(),
            message: "document contains no text".to_string(),
        });
    }

    debug!(
        "Loaded {:?} document {} ({} chars)",
        format,
        path.display(),
        text.chars().count()
    );

    Ok(Document::new(path, text))
}

/// Load every document, failing on the first one that cannot be read
#[inline]
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let documents = paths
        .iter()
        .map(|path| load_document(path))
        .collect::<Result<Vec<_>>>()?;

    info!("Loaded {} documents", documents.len());
    Ok(documents)
}

/// Flatten Markdown into paragraphs separated by blank lines
fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Item) => text.push_str("- "),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock | TagEnd::BlockQuote(_),
            ) => {
                text.truncate(text.trim_end().len());
                text.push_str("\n\n");
            }
            Event::End(TagEnd::Item) => {
                text.truncate(text.trim_end().len());
                text.push('\n');
            }
            Event::End(TagEnd::List(_)) => text.push('\n'),
            Event::Text(chunk) | Event::Code(chunk) => text.push_str(&chunk),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            _ => {}
        }
    }

    text.trim().to_string()
}

/// Extract the visible text of an HTML page, one block element per paragraph
fn html_to_text(html: &str) -> std::result::Result<String, String> {
    let document = Html::parse_document(html);
    let blocks = Selector::parse(&BLOCK_TAGS.join(", ")).map_err(|e| e.to_string())?;

    let paragraphs: Vec<String> = document
        .select(&blocks)
        .filter(|element| !has_block_ancestor(element))
        .map(|element| normalize_whitespace(&element.text().collect::<String>()))
        .filter(|paragraph| !paragraph.is_empty())
        .collect();

    if !paragraphs.is_empty() {
        return Ok(paragraphs.join("\n\n"));
    }

    // No block markup, fall back to everything under <body>
    let body = Selector::parse("body").map_err(|e| e.to_string())?;
    Ok(document
        .select(&body)
        .next()
        .map(|body| normalize_whitespace(&body.text().collect::<String>()))
        .unwrap_or_default())
}

fn has_block_ancestor(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| BLOCK_TAGS.contains(&e.name()))
    })
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
