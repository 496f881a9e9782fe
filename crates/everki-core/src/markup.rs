use roxmltree::{Document, Node, ParsingOptions};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("XML parse failed: {0}")]
    Parse(#[from] roxmltree::Error),
}

pub type MarkupResult<T> = Result<T, MarkupError>;

pub const CONTENT_TAG: &str = "div";
pub const LINE_BREAK: &str = "<br/>";

const PROLOGUE: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    "\n",
    r#"<!DOCTYPE en-note SYSTEM "http://xml.evernote.com/pub/enml2.dtd">"#,
    "\n",
);

/// Result of splicing lines into a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    /// The full rendered body
    pub body: String,
    /// The markup inserted into it, including any leading line break
    pub block: String,
}

/// A parsed document body.
///
/// Lines are the text nodes under the content root: the first `<div>` child
/// of the document element, or the document element itself when there is
/// none.
pub struct MarkupBody<'input> {
    source: &'input str,
    document: Document<'input>,
}

impl<'input> MarkupBody<'input> {
    pub fn parse(source: &'input str) -> MarkupResult<Self> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let document = Document::parse_with_options(source, options)?;
        Ok(Self { source, document })
    }

    fn content_root(&self) -> Node<'_, 'input> {
        let root = self.document.root_element();
        root.children()
            .find(|n| n.is_element() && n.has_tag_name(CONTENT_TAG))
            .unwrap_or(root)
    }

    /// Text nodes under the content root in document order. Each call starts
    /// a fresh walk.
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.content_root()
            .descendants()
            .filter(Node::is_text)
            .filter_map(|n| n.text())
    }

    /// Lines joined by newlines, for matching search terms against what a
    /// reader sees rather than the markup.
    pub fn text(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }

    /// Renders a new body with `lines` appended at the end of the content
    /// root. Returns `None` when there is nothing to append.
    pub fn append_lines<S: AsRef<str>>(&self, lines: &[S]) -> Option<Appended> {
        if lines.is_empty() {
            return None;
        }

        let root = self.content_root();
        let mut block = String::new();
        if root.has_children() {
            block.push_str(LINE_BREAK);
        }
        block.push_str(&join_lines(lines));

        let range = root.range();
        let element = &self.source[range.clone()];

        let mut out = String::with_capacity(self.source.len() + block.len());
        if let Some(close) = element.rfind("</") {
            let at = range.start + close;
            out.push_str(&self.source[..at]);
            out.push_str(&block);
            out.push_str(&self.source[at..]);
        } else {
            let open = element.trim_end_matches("/>").trim_end();
            let name: String = open[1..]
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != '/' && *c != '>')
                .collect();
            out.push_str(&self.source[..range.start]);
            out.push_str(open);
            out.push('>');
            out.push_str(&block);
            out.push_str(&format!("</{name}>"));
            out.push_str(&self.source[range.end..]);
        }

        Some(Appended { body: out, block })
    }
}

/// Escapes and joins lines with line breaks into one markup block.
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(|l| escape_text(l.as_ref()))
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Body of a document holding `lines` in a single content root.
pub fn render_document<S: AsRef<str>>(lines: &[S]) -> String {
    format!(
        "{PROLOGUE}<en-note><{CONTENT_TAG}>{}</{CONTENT_TAG}></en-note>",
        join_lines(lines)
    )
}

pub fn empty_document() -> String {
    render_document::<&str>(&[])
}
