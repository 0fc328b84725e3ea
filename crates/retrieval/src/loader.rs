//! Document format detection and text extraction.

use crate::corpus::CorpusFile;
use lexrag_core::{AppError, AppResult};
use std::path::Path;

/// Document format classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Html,
    Unsupported,
}

impl DocumentFormat {
    /// Detect format from file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("txt") | Some("text") => Self::PlainText,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            _ => Self::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Extract plain text from a corpus file.
///
/// Markdown is stripped of structural syntax, HTML of tags and script/style
/// bodies. Binary and unsupported files are rejected with a per-document
/// error; the caller decides whether that fails the run or becomes a warning.
pub fn extract_text(file: &CorpusFile) -> AppResult<String> {
    let format = DocumentFormat::from_path(&file.path);
    if format == DocumentFormat::Unsupported {
        return Err(AppError::DocumentFormat(format!(
            "Unsupported document format: {}",
            file.source
        )));
    }

    if file.data.contains(&0) {
        return Err(AppError::DocumentFormat(format!(
            "Binary content in {}",
            file.source
        )));
    }

    let raw = std::str::from_utf8(&file.data).map_err(|_| {
        AppError::DocumentFormat(format!("Invalid UTF-8 in {}", file.source))
    })?;

    let text = match format {
        DocumentFormat::PlainText => raw.to_string(),
        DocumentFormat::Markdown => clean_markdown(raw),
        DocumentFormat::Html => clean_html(raw),
        DocumentFormat::Unsupported => unreachable!(),
    };

    Ok(text)
}

/// Strip markdown syntax, keeping the prose.
///
/// Headers lose their `#` markers, fenced code blocks are dropped entirely,
/// links keep their anchor text. Numbered list markers are kept: in legal
/// documents the numbering is usually a section reference worth indexing.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        // Horizontal rules carry no text
        if is_rule(trimmed) {
            continue;
        }

        let mut line = trimmed.trim_start_matches('#').trim_start();
        line = line.strip_prefix("- ").unwrap_or(line);
        line = line.strip_prefix("* ").unwrap_or(line);
        line = line.strip_prefix("> ").unwrap_or(line);

        let cleaned = strip_inline(line);
        let cleaned = cleaned.trim();
        if !cleaned.is_empty() {
            result.push_str(cleaned);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3
        && (line.chars().all(|c| c == '-')
            || line.chars().all(|c| c == '*')
            || line.chars().all(|c| c == '_'))
}

/// Rewrite `[anchor](url)` to `anchor` and drop emphasis and code markers.
fn strip_inline(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut chars = line.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match ch {
            '[' => {
                // Link: copy anchor text, skip the (url) part if present
                if let Some(close) = line[i..].find(']') {
                    let anchor = &line[i + 1..i + close];
                    let after = &line[i + close + 1..];
                    result.push_str(anchor);

                    let mut skip_to = i + close + 1;
                    if let Some(rest) = after.strip_prefix('(') {
                        if let Some(paren) = rest.find(')') {
                            skip_to = i + close + 2 + paren + 1;
                        }
                    }
                    while let Some(&(j, _)) = chars.peek() {
                        if j < skip_to {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                } else {
                    result.push(ch);
                }
            }
            '*' | '`' => {}
            _ => result.push(ch),
        }
    }

    result
}

/// Strip HTML tags and script/style bodies, then decode common entities.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;

            let rest = &text[i..];
            if starts_ignore_case(rest, "<script") {
                in_script = true;
            } else if starts_ignore_case(rest, "</script") {
                in_script = false;
            } else if starts_ignore_case(rest, "<style") {
                in_style = true;
            } else if starts_ignore_case(rest, "</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
            // Tag boundaries separate words even when the markup carried no
            // whitespace, e.g. `<td>rent</td><td>due</td>`
            result.push(' ');
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    decode_entities(&result)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn starts_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .get(..needle.len())
        .map(|prefix| prefix.eq_ignore_ascii_case(needle))
        .unwrap_or(false)
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(name: &str, data: &[u8]) -> CorpusFile {
        CorpusFile {
            source: name.to_string(),
            path: PathBuf::from(name),
            data: data.to_vec(),
            content_hash: String::new(),
            modified_ms: 0,
        }
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("lease.txt")),
            DocumentFormat::PlainText
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("lease.MD")),
            DocumentFormat::Markdown
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("lease.htm")),
            DocumentFormat::Html
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("lease.pdf")),
            DocumentFormat::Unsupported
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("README")),
            DocumentFormat::Unsupported
        );
    }

    #[test]
    fn test_plain_text_passes_through() {
        let text = extract_text(&file("a.txt", b"The lessee shall pay rent.")).unwrap();
        assert_eq!(text, "The lessee shall pay rent.");
    }

    #[test]
    fn test_markdown_stripped() {
        let input = "# Lease Terms\n\nRent is **due** monthly.\n\n```\nraw block\n```\n\nSee [Exhibit B](./b.md) for details.\n";
        let text = extract_text(&file("a.md", input.as_bytes())).unwrap();
        assert!(text.contains("Lease Terms"));
        assert!(text.contains("Rent is due monthly."));
        assert!(text.contains("See Exhibit B for details."));
        assert!(!text.contains("raw block"));
        assert!(!text.contains("**"));
        assert!(!text.contains("./b.md"));
    }

    #[test]
    fn test_html_stripped() {
        let input = "<html><head><style>p { color: red }</style></head>\
                     <body><p>Quiet &amp; peaceful enjoyment</p>\
                     <script>var x = 1;</script></body></html>";
        let text = extract_text(&file("a.html", input.as_bytes())).unwrap();
        assert_eq!(text, "Quiet & peaceful enjoyment");
    }

    #[test]
    fn test_html_adjacent_cells_stay_separate_words() {
        let input = "<table><tr><td>rent</td><td>due</td></tr></table>";
        let text = extract_text(&file("a.html", input.as_bytes())).unwrap();
        assert_eq!(text, "rent due");
    }

    #[test]
    fn test_binary_rejected() {
        let err = extract_text(&file("a.txt", b"abc\x00def")).unwrap_err();
        assert!(err.to_string().contains("Binary"));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = extract_text(&file("a.txt", &[0xff, 0xfe, 0x41])).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = extract_text(&file("a.docx", b"whatever")).unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }
}
