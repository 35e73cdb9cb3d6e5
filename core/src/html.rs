use anyhow::{bail, Result};
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Bounds applied while converting mail bodies, pathological markup fails fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlToTextLimits {
    pub max_input_length: usize,
    pub max_depth: usize,
}

impl Default for HtmlToTextLimits {
    fn default() -> Self {
        Self {
            max_input_length: 16 * 1024 * 1024,
            max_depth: 1024,
        }
    }
}

const SKIPPED: &[&str] = &["script", "style", "head", "template"];
const BLOCKS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "td", "th", "tr",
    "ul",
];

/// Convert an HTML fragment to plain text.
pub fn html_to_text(html: &str, limits: &HtmlToTextLimits) -> Result<String> {
    if html.len() > limits.max_input_length {
        bail!(
            "html input of {} bytes exceeds the {} bytes limit",
            html.len(),
            limits.max_input_length
        );
    }
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len() / 2);
    walk(fragment.root_element(), 0, limits, &mut out)?;
    Ok(out.trim().to_string())
}

fn walk(element: ElementRef<'_>, depth: usize, limits: &HtmlToTextLimits, out: &mut String) -> Result<()> {
    if depth > limits.max_depth {
        bail!("html nesting exceeds the depth limit of {}", limits.max_depth);
    }
    let name = element.value().name();
    if SKIPPED.contains(&name) {
        return Ok(());
    }
    let block = BLOCKS.contains(&name);
    if block {
        line_break(out);
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_text(out, text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    walk(child, depth + 1, limits, out)?;
                }
            }
            _ => {}
        }
    }
    if block {
        line_break(out);
    }
    Ok(())
}

fn push_text(out: &mut String, text: &str) {
    for (i, word) in text.split_whitespace().enumerate() {
        let starts_with_space = i == 0 && text.starts_with(char::is_whitespace);
        if (i > 0 || starts_with_space) && !out.is_empty() && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        out.push_str(word);
    }
    if text.ends_with(char::is_whitespace) && !out.is_empty() && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn line_break(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}
