//! HTML directory-listing renderer
//!
//! Entry names originate in the remote store and can contain anything a
//! file name can hold, including markup. Every dynamic string is escaped
//! for the context it lands in: text nodes through [`encode_text`], href
//! attributes percent-encoded and then attribute-escaped.

use html_escape::{encode_double_quoted_attribute, encode_text};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use remote::DirectoryEntry;

use crate::constants::VIDEO_EXTENSIONS;

/// Characters percent-encoded inside generated hrefs
///
/// CONTROLS plus everything that would change how a browser parses the URL
/// or the surrounding attribute.
const HREF_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'%');

/// Render a directory listing document
///
/// `current_path` is the validated relative path; the empty string denotes
/// the store root, which is the one case without a parent-directory link.
pub fn render(entries: &[DirectoryEntry], current_path: &str) -> String {
    let current_path = current_path.trim_end_matches('/');
    let title = encode_text(current_path);

    let mut html = String::with_capacity(1024 + entries.len() * 128);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str(&format!("<title>Media Library - /{}</title>\n", title));
    html.push_str("<style>\n");
    html.push_str("body { font-family: Arial, sans-serif; margin: 40px; }\n");
    html.push_str(".file { display: block; padding: 10px; text-decoration: none; color: #333; }\n");
    html.push_str(".file:hover { background: #f0f0f0; }\n");
    html.push_str(".directory { font-weight: bold; color: #0066cc; }\n");
    html.push_str(".video { color: #ff6600; }\n");
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str(&format!("<h1>📁 Media Library: /{}</h1>\n", title));

    if !current_path.is_empty() {
        html.push_str(&format!(
            "<a href=\"/{}\" class=\"file directory\">📁 .. (Parent Directory)</a>\n",
            href_attr(parent_path(current_path)),
        ));
    }

    for entry in entries {
        let entry_path = if current_path.is_empty() {
            entry.name.clone()
        } else {
            format!("{}/{}", current_path, entry.name)
        };
        let href = href_attr(&entry_path);
        let label = encode_text(&entry.name);

        if entry.is_dir {
            html.push_str(&format!(
                "<a href=\"/{}\" class=\"file directory\">📁 {}</a>\n",
                href, label
            ));
        } else {
            let icon = if is_video(&entry.name) { "🎬" } else { "📄" };
            html.push_str(&format!(
                "<a href=\"/{}\" class=\"file video\">{} {}</a>\n",
                href, icon, label
            ));
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Percent-encode a path and escape it for a double-quoted attribute
fn href_attr(path: &str) -> String {
    let encoded = utf8_percent_encode(path, HREF_ENCODE).to_string();
    encode_double_quoted_attribute(&encoded).to_string()
}

/// Parent of a relative path; empty string for top-level entries
fn parent_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// Cosmetic classification only; it plays no security role
fn is_video(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    VIDEO_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}
