//! HTML report generation
//!
//! Renders extracted records as a single table: link, name, price and a
//! thumbnail of the image. Every cell is escaped.

use crate::extract::ExtractedRecord;
use crate::output::OutputResult;
use std::fs;
use std::path::Path;

/// Writes the report for `records` to `output_path`
///
/// The parent directory is created when missing; an existing report is
/// replaced.
pub fn write_report(records: &[ExtractedRecord], output_path: &Path) -> OutputResult<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(output_path, render_report(records))?;
    tracing::info!("HTML file saved to {}", output_path.display());
    Ok(())
}

/// Renders the report document
pub fn render_report(records: &[ExtractedRecord]) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Product List</title>\n</head>\n<body>\n");
    html.push_str("<h2>Product List</h2>\n");
    html.push_str("<table border=\"1\">\n");
    html.push_str(
        "<tr><th>Product Link</th><th>Product Name</th><th>Price</th><th>Image</th></tr>\n",
    );

    for record in records {
        let link = escape_html(&record.detail_link);
        let name = escape_html(&record.name);

        html.push_str("<tr>");
        html.push_str(&format!("<td><a href=\"{}\">{}</a></td>", link, name));
        html.push_str(&format!("<td>{}</td>", name));
        html.push_str(&format!("<td>{}</td>", escape_html(&record.price)));
        if record.image_url.is_empty() {
            html.push_str("<td></td>");
        } else {
            html.push_str(&format!(
                "<td><img src=\"{}\" width=\"100\"></td>",
                escape_html(&record.image_url)
            ));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

/// Escapes text for use in element content and quoted attributes
///
/// ```
/// use netsieve::output::escape_html;
///
/// assert_eq!(escape_html(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
