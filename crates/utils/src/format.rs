//! Rich-text formatting applied to user supplied content.
//!
//! The [`TextFormatter`] trait is the seam to the host's text pipeline.
//! [`BasicFormatter`] is a self-contained implementation that renders the
//! supported formats to HTML and, unless the content is trusted, passes the
//! result through an allowlist HTML sanitizer.

use std::collections::HashSet;

use ammonia::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// URL schemes links and images may keep after cleaning.
const SAFE_URL_SCHEMES: [&str; 5] = ["http", "https", "mailto", "ftp", "tel"];

/// Text formats understood by the host editor, with their stored codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextFormat {
    Moodle,
    #[default]
    Html,
    Plain,
    Markdown,
}

impl TextFormat {
    /// Integer code of the HTML format, the editor default.
    pub const HTML_CODE: i64 = 1;

    /// Returns the stored integer code.
    pub fn code(self) -> i64 {
        match self {
            TextFormat::Moodle => 0,
            TextFormat::Html => Self::HTML_CODE,
            TextFormat::Plain => 2,
            TextFormat::Markdown => 4,
        }
    }

    /// Maps a stored integer code back to a format.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TextFormat::Moodle),
            Self::HTML_CODE => Some(TextFormat::Html),
            2 => Some(TextFormat::Plain),
            4 => Some(TextFormat::Markdown),
            _ => None,
        }
    }
}

/// Context content is rendered in. Filters and permissions of the host are
/// scoped by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderContext {
    #[default]
    System,
    Course(i64),
    Block(i64),
    User(i64),
}

/// Options for a single [`TextFormatter::format_text`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatOptions {
    pub context: RenderContext,

    /// Content comes from a trusted source and may keep active markup.
    pub trusted: bool,

    /// Skip cleaning entirely.
    pub noclean: bool,
}

impl FormatOptions {
    /// Options for untrusted content rendered in `context`, always cleaned.
    pub fn untrusted(context: RenderContext) -> Self {
        Self {
            context,
            trusted: false,
            noclean: false,
        }
    }

    /// Whether the output has to be cleaned.
    pub fn needs_cleaning(&self) -> bool {
        !self.trusted && !self.noclean
    }
}

/// Trait for text formatters that render stored text for display.
pub trait TextFormatter: Send + Sync {
    /// Renders `raw` stored in `format` to HTML.
    fn format_text(&self, raw: &str, format: TextFormat, options: &FormatOptions) -> String;
}

/// Formatter rendering to HTML, cleaning untrusted output with [`clean_html`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicFormatter;

impl BasicFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl TextFormatter for BasicFormatter {
    fn format_text(&self, raw: &str, format: TextFormat, options: &FormatOptions) -> String {
        let rendered = match format {
            TextFormat::Plain => newlines_to_breaks(&escape_html(raw)),
            TextFormat::Moodle => newlines_to_breaks(raw),
            TextFormat::Html | TextFormat::Markdown => raw.to_string(),
        };

        if !options.needs_cleaning() {
            return rendered;
        }

        let cleaned = clean_html(&rendered);
        if cleaned.len() != rendered.len() {
            debug!(
                context = ?options.context,
                removed = rendered.len().saturating_sub(cleaned.len()),
                "Removed active content from formatted text"
            );
        }
        cleaned
    }
}

/// Escapes the five HTML special characters.
///
/// # Examples
///
/// ```rust
/// assert_eq!(
///     quickmail_utils::escape_html("<b>\"Tom\" & 'Jerry'</b>"),
///     "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
/// );
/// ```
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
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

/// Removes active content from an HTML fragment.
///
/// The fragment is parsed as HTML and re-serialized keeping only allowlisted
/// tags and attributes. `script` and `style` elements are dropped with their
/// content, other unknown elements are unwrapped, and URLs survive only with
/// an `http`, `https`, `mailto`, `ftp` or `tel` scheme (relative URLs are
/// kept). Output is normalized, so `<br />` is written as `<br>`.
///
/// # Examples
///
/// ```rust
/// assert_eq!(
///     quickmail_utils::clean_html("<b onclick=\"x()\">Ann</b><script>x()</script>"),
///     "<b>Ann</b>"
/// );
/// ```
pub fn clean_html(html: &str) -> String {
    Builder::default()
        .link_rel(None)
        .url_schemes(HashSet::from(SAFE_URL_SCHEMES))
        .clean(html)
        .to_string()
}

fn newlines_to_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "<br />")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn untrusted() -> FormatOptions {
        FormatOptions::untrusted(RenderContext::System)
    }

    #[test]
    fn test_text_format_codes() {
        assert_eq!(TextFormat::Html.code(), 1);
        assert_eq!(TextFormat::from_code(4), Some(TextFormat::Markdown));
        assert_eq!(TextFormat::from_code(3), None);
        assert_eq!(TextFormat::default(), TextFormat::Html);
    }

    #[test]
    fn test_format_options_default_is_cleaned() {
        let options = FormatOptions::default();
        assert_eq!(options.context, RenderContext::System);
        assert!(options.needs_cleaning());
    }

    #[test]
    fn test_format_html_passthrough() {
        let formatter = BasicFormatter::new();
        assert_eq!(
            formatter.format_text("<p>Regards, <b>Ann</b></p>", TextFormat::Html, &untrusted()),
            "<p>Regards, <b>Ann</b></p>"
        );
    }

    #[test]
    fn test_format_plain_escapes_and_breaks() {
        let formatter = BasicFormatter::new();
        assert_eq!(
            formatter.format_text("Ann <ann@x.com>\r\nTeacher", TextFormat::Plain, &untrusted()),
            "Ann &lt;ann@x.com&gt;<br>Teacher"
        );
    }

    #[test]
    fn test_format_moodle_breaks_lines() {
        let formatter = BasicFormatter::new();
        assert_eq!(
            formatter.format_text("<i>Ann</i>\nTeacher", TextFormat::Moodle, &untrusted()),
            "<i>Ann</i><br>Teacher"
        );

        let options = FormatOptions {
            noclean: true,
            ..FormatOptions::default()
        };
        assert_eq!(
            formatter.format_text("a\r\nb", TextFormat::Moodle, &options),
            "a<br />b"
        );
    }

    #[test]
    fn test_format_untrusted_removes_scripts() {
        let formatter = BasicFormatter::new();
        let raw = "<p>Hi</p><script type=\"text/javascript\">alert(1)</script><STYLE>p{}</STYLE>";
        assert_eq!(
            formatter.format_text(raw, TextFormat::Html, &untrusted()),
            "<p>Hi</p>"
        );
    }

    #[test]
    fn test_format_trusted_keeps_scripts() {
        let formatter = BasicFormatter::new();
        let raw = "<p>Hi</p><script>alert(1)</script>";
        let options = FormatOptions {
            trusted: true,
            ..FormatOptions::default()
        };
        assert_eq!(formatter.format_text(raw, TextFormat::Html, &options), raw);

        let options = FormatOptions {
            noclean: true,
            ..FormatOptions::default()
        };
        assert_eq!(formatter.format_text(raw, TextFormat::Html, &options), raw);
    }

    #[test]
    fn test_clean_html_event_handlers() {
        assert_eq!(
            clean_html("<img src=\"a.png\" onerror=\"alert(1)\" alt='x'>"),
            "<img src=\"a.png\" alt=\"x\">"
        );
        assert_eq!(
            clean_html("<a href=\"#\" OnClick='steal()'>x</a>"),
            "<a href=\"#\">x</a>"
        );
    }

    #[test]
    fn test_clean_html_script_urls() {
        assert_eq!(clean_html("<a href=\"javascript:alert(1)\">x</a>"), "<a>x</a>");
        assert_eq!(clean_html("<a href=javascript:void(0)>x</a>"), "<a>x</a>");
        assert_eq!(
            clean_html("<a href=\"https://x.com/a\">x</a>"),
            "<a href=\"https://x.com/a\">x</a>"
        );
        assert_eq!(
            clean_html("<a href=\"mailto:ann@x.com\">Ann</a>"),
            "<a href=\"mailto:ann@x.com\">Ann</a>"
        );
    }

    #[test]
    fn test_clean_html_stray_tags() {
        let cleaned = clean_html("<p>a</p><embed src=\"x.swf\"><iframe src=\"y\">");
        assert!(cleaned.starts_with("<p>a</p>"));
        assert!(!cleaned.contains("<embed"));
        assert!(!cleaned.contains("<iframe"));
    }

    #[test]
    fn test_clean_html_slash_separated_attributes() {
        assert_eq!(clean_html("<svg/onload=alert(1)>"), "");
        let cleaned = clean_html("<img src=\"x\"/onerror=alert(1)>");
        assert_eq!(cleaned, "<img src=\"x\">");
    }

    #[test]
    fn test_clean_html_obfuscated_schemes() {
        let encoded = clean_html("<a href=\"jav&#x61;script:alert(1)\">x</a>");
        assert_eq!(encoded, "<a>x</a>");

        let tab_split = clean_html("<a href=\"java\tscript:alert(1)\">x</a>");
        assert_eq!(tab_split, "<a>x</a>");

        let decimal = clean_html("<img src=\"&#106;avascript:alert(1)\">");
        assert!(!decimal.to_lowercase().contains("script"));
    }

    #[test]
    fn test_clean_html_unlisted_url_attributes() {
        let button = clean_html("<button formaction=\"javascript:alert(1)\">go</button>");
        assert!(!button.contains("formaction"));
        assert!(!button.contains("javascript"));

        let xlink = clean_html(
            "<svg><a xlink:href=\"javascript:alert(1)\"><text>x</text></a></svg>",
        );
        assert!(!xlink.contains("xlink"));
        assert!(!xlink.contains("javascript"));

        let form = clean_html("<form action=\"javascript:alert(1)\"><input></form>");
        assert!(!form.contains("javascript"));
    }

    #[test]
    fn test_clean_html_mixed_case_tags() {
        assert_eq!(clean_html("<ScRiPt src=\"//x.js\"></sCrIpT><b>ok</b>"), "<b>ok</b>");
        assert_eq!(
            clean_html("<IMG SRC=\"a.png\" OnError=\"alert(1)\">"),
            "<img src=\"a.png\">"
        );
        assert_eq!(
            clean_html("<A HREF=\"JaVaScRiPt:alert(1)\">x</A>"),
            "<a>x</a>"
        );
    }
}
