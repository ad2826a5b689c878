use std::fmt::Write;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::types::{Analysis, ChatMessage, DocumentInfo};

pub const DISCLAIMER: &str = "This report was generated by an AI assistant from the text of the uploaded document. \
It is for information only and is not legal advice. Consult a qualified legal professional before acting on it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Html,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
        }
    }
}

/// Whether a link target may be emitted as-is. Relative targets and
/// `http`, `https` and `mailto` URLs are allowed.
pub fn is_safe_link(dest: &str) -> bool {
    // Browsers ignore whitespace and control chars inside a scheme.
    let cleaned: String = dest
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    match cleaned.split_once(':') {
        Some((scheme, _)) if !scheme.contains(['/', '?', '#']) => {
            matches!(scheme, "http" | "https" | "mailto")
        },
        _ => true,
    }
}

fn safe_link(dest: CowStr<'_>) -> CowStr<'_> {
    if is_safe_link(&dest) {
        dest
    } else {
        CowStr::Borrowed("#")
    }
}

/// Render model-written Markdown to HTML. Raw HTML in the input is escaped
/// rather than passed through. Unsafe link targets become `#`, and images
/// are rendered as plain links so nothing is fetched on display.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { link_type, dest_url, title, id })
        | Event::Start(Tag::Image { link_type, dest_url, title, id }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_link(dest_url),
            title,
            id,
        }),
        Event::End(TagEnd::Image) => Event::End(TagEnd::Link),
        other => other,
    });
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// `contract v2.pdf` -> `contract_v2`. Falls back to `document`.
pub fn file_stem(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Everything that goes into a downloadable report.
pub struct Report<'a> {
    pub document: &'a DocumentInfo,
    pub analysis: &'a Analysis,
    pub messages: &'a [ChatMessage],
}

impl Report<'_> {
    pub fn file_name(&self, format: ExportFormat) -> String {
        format!("{}-analysis.{}", file_stem(&self.document.name), format.extension())
    }

    pub fn render(&self, format: ExportFormat) -> String {
        match format {
            ExportFormat::Markdown => self.markdown(),
            ExportFormat::Html => self.html(),
        }
    }

    fn metadata_lines(&self) -> Vec<(&'static str, String)> {
        let d = self.document;
        let mut pages = format!("{} ({} with text)", d.page_count, d.text_pages);
        if d.truncated {
            pages.push_str(", text truncated for analysis");
        }
        vec![
            ("File", d.name.clone()),
            ("Pages", pages),
            ("Characters", d.char_count.to_string()),
            ("SHA-256", d.sha256.clone()),
            (
                "Generated",
                self.analysis.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            ),
            ("Model", self.analysis.model.clone()),
        ]
    }

    pub fn markdown(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "# Legal Document Analysis: {}\n", self.document.name);
        for (label, value) in self.metadata_lines() {
            let _ = writeln!(s, "- **{label}:** {value}");
        }

        let _ = writeln!(s, "\n## Simple Summary\n\n{}\n", self.analysis.summary.trim());
        let _ = writeln!(s, "## Risk & Clause Breakdown\n\n{}\n", self.analysis.risks.trim());
        let _ = writeln!(s, "## Executive Dashboard\n\n{}\n", self.analysis.dashboard.trim());

        if !self.messages.is_empty() {
            s.push_str("## Questions & Answers\n\n");
            for m in self.messages {
                let _ = writeln!(s, "**{}:** {}\n", m.role.label(), m.content.trim());
            }
        }

        let _ = writeln!(s, "---\n\n_{DISCLAIMER}_");
        s
    }

    pub fn html(&self) -> String {
        let title = format!("Legal Document Analysis: {}", self.document.name);
        let mut s = String::new();
        let _ = write!(
            s,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{REPORT_CSS}</style>\n</head>\n<body>\n",
            html_escape::encode_text(&title)
        );
        let _ = writeln!(s, "<h1>{}</h1>", html_escape::encode_text(&title));

        s.push_str("<table class=\"meta\">\n");
        for (label, value) in self.metadata_lines() {
            let _ = writeln!(
                s,
                "<tr><th>{label}</th><td>{}</td></tr>",
                html_escape::encode_text(&value)
            );
        }
        s.push_str("</table>\n");

        for (heading, body) in [
            ("Simple Summary", &self.analysis.summary),
            ("Risk &amp; Clause Breakdown", &self.analysis.risks),
            ("Executive Dashboard", &self.analysis.dashboard),
        ] {
            let _ = write!(
                s,
                "<section>\n<h2>{heading}</h2>\n{}</section>\n",
                markdown_to_html(body)
            );
        }

        if !self.messages.is_empty() {
            s.push_str("<section>\n<h2>Questions &amp; Answers</h2>\n");
            for m in self.messages {
                let _ = write!(
                    s,
                    "<div class=\"msg {}\"><div class=\"role\">{}</div>{}</div>\n",
                    m.role.label().to_lowercase(),
                    m.role.label(),
                    markdown_to_html(&m.content)
                );
            }
            s.push_str("</section>\n");
        }

        let _ = write!(
            s,
            "<footer>{}</footer>\n</body>\n</html>\n",
            html_escape::encode_text(DISCLAIMER)
        );
        s
    }
}

const REPORT_CSS: &str = "\
body{font-family:Georgia,serif;max-width:48rem;margin:2rem auto;padding:0 1rem;color:#262730;line-height:1.5}\
h1{font-size:1.6rem;border-bottom:2px solid #262730;padding-bottom:.3rem}\
h2{font-size:1.2rem;margin-top:2rem}\
table{border-collapse:collapse;margin:1rem 0}\
th,td{border:1px solid #ccc;padding:.3rem .6rem;text-align:left;vertical-align:top}\
table.meta th{background:#f0f2f6;white-space:nowrap}\
.msg{border-left:3px solid #ccc;padding:.2rem .8rem;margin:.6rem 0}\
.msg.user{border-color:#4a90d9;background:#e1f5fe}\
.role{font-weight:bold;font-size:.85rem}\
footer{margin-top:3rem;font-size:.85rem;color:#666;font-style:italic}\
@media print{body{margin:0;max-width:none}section{page-break-inside:avoid}}";
