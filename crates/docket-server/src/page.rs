use std::fmt::Write;

use docket_core::{
    export::markdown_to_html,
    session::{Session, NOTHING_ANALYZED},
    types::{DocumentInfo, Notice},
};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

pub const TITLE: &str = "GenAI Legal Document Assistant";

/// Static facts about the deployment shown on the page.
pub struct PageContext<'a> {
    pub model: &'a str,
    pub max_upload_mb: usize,
}

fn notice_html(out: &mut String, notice: &Notice) {
    let _ = writeln!(
        out,
        "<div class=\"notice {}\" role=\"status\">{}</div>",
        notice.level.as_str(),
        text(&notice.text)
    );
}

fn document_meta(out: &mut String, doc: &DocumentInfo) {
    let _ = write!(
        out,
        "<p class=\"doc-meta\"><strong>{}</strong> &middot; {} pages &middot; {} characters",
        text(&doc.name),
        doc.page_count,
        doc.char_count
    );
    if doc.truncated {
        out.push_str(" &middot; <em>long document, text truncated for analysis</em>");
    }
    out.push_str("</p>\n");
}

fn sidebar(out: &mut String, ctx: &PageContext<'_>, busy: bool) {
    out.push_str("<aside>\n<h2>1. Upload Document</h2>\n");
    let _ = write!(
        out,
        "<form method=\"post\" action=\"/analyze\" enctype=\"multipart/form-data\" data-wait=\"AI is analyzing the document. This may take a moment...\">\n\
         <label for=\"document\">Choose a PDF file</label>\n\
         <input type=\"file\" id=\"document\" name=\"document\" accept=\"application/pdf,.pdf\">\n\
         <p class=\"hint\">Only PDF files are accepted (up to {} MB).</p>\n\
         <button type=\"submit\" class=\"primary\"{}>Analyze Document</button>\n\
         </form>\n",
        ctx.max_upload_mb,
        if busy { " disabled" } else { "" }
    );
    out.push_str(
        "<form method=\"post\" action=\"/reset\"><button type=\"submit\">Start over</button></form>\n",
    );
    let _ = writeln!(out, "<p class=\"hint\">Model: {}</p>\n</aside>", text(ctx.model));
}

fn results(out: &mut String, session: &Session) {
    let (Some(doc), Some(analysis)) = (&session.document, &session.analysis) else {
        return;
    };

    out.push_str("<h2>Analysis Results</h2>\n");
    document_meta(out, doc);

    let _ = write!(
        out,
        "<div class=\"columns\">\n\
         <section class=\"col\"><h3>📝 Simple Summary</h3>\n{}</section>\n\
         <section class=\"col wide\"><h3>📊 Risk &amp; Clause Breakdown</h3>\n{}</section>\n\
         </div>\n\
         <section><h3>📋 Executive Dashboard</h3>\n{}</section>\n",
        markdown_to_html(&analysis.summary),
        markdown_to_html(&analysis.risks),
        markdown_to_html(&analysis.dashboard),
    );

    out.push_str(
        "<p class=\"export\">Export report: \
         <a href=\"/export?format=markdown\">Markdown</a> &middot; \
         <a href=\"/export?format=html\">HTML</a></p>\n<hr>\n",
    );

    out.push_str("<h2 id=\"chat\">💬 Chat with Your Document</h2>\n<div class=\"transcript\">\n");
    for m in &session.messages {
        let role = m.role.label().to_lowercase();
        let _ = write!(
            out,
            "<div class=\"msg {}\"><div class=\"role\">{}</div>{}</div>\n",
            attr(&role),
            m.role.label(),
            markdown_to_html(&m.content)
        );
    }
    if session.busy {
        out.push_str("<div class=\"msg assistant pending\">Searching for the answer...</div>\n");
    }
    out.push_str("</div>\n");

    let _ = write!(
        out,
        "<form method=\"post\" action=\"/chat\" class=\"chat\" data-wait=\"Searching for the answer...\">\n\
         <input type=\"text\" name=\"question\" autocomplete=\"off\" placeholder=\"Ask a specific question (e.g., 'What is the late fee?')\"{}>\n\
         <button type=\"submit\" class=\"primary\"{}>Ask</button>\n\
         </form>\n",
        if session.busy { " disabled" } else { " autofocus" },
        if session.busy { " disabled" } else { "" }
    );
}

/// Render the whole single-page UI for `session`.
pub fn render(session: &Session, ctx: &PageContext<'_>) -> String {
    let mut out = String::with_capacity(16 * 1024);
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{TITLE}</title>\n<style>{PAGE_CSS}</style>\n</head>\n<body>\n"
    );
    sidebar(&mut out, ctx, session.busy);

    let _ = write!(
        out,
        "<main>\n<h1>⚖️ {TITLE}</h1>\n<p class=\"lead\">Understand your legal documents instantly. \
         Upload a PDF to get a simple summary, risk analysis, and ask questions.</p>\n"
    );

    if let Some(notice) = &session.notice {
        notice_html(&mut out, notice);
    }
    if session.is_analyzed() {
        results(&mut out, session);
    } else if session.busy {
        notice_html(&mut out, &Notice::info("AI is analyzing the document. This may take a moment..."));
    } else {
        notice_html(&mut out, &Notice::info(NOTHING_ANALYZED));
    }

    out.push_str("</main>\n");
    let _ = write!(out, "<script>{PAGE_JS}</script>\n</body>\n</html>\n");
    out
}

const PAGE_CSS: &str = "\
*{box-sizing:border-box}\
body{margin:0;display:flex;min-height:100vh;font-family:system-ui,sans-serif;background:#f0f2f6;color:#262730}\
aside{width:18rem;flex-shrink:0;padding:1.5rem;background:#fff;border-right:1px solid #dde}\
aside form{margin-bottom:1rem}\
main{flex:1;padding:1.5rem 2.5rem;max-width:80rem}\
h1{margin-top:0}\
.lead{color:#555}\
.hint{font-size:.8rem;color:#777}\
button{border-radius:5px;border:1px solid #ccd;background:#fff;padding:.45rem 1rem;cursor:pointer;width:100%}\
button.primary{background:#ff4b4b;border-color:#ff4b4b;color:#fff}\
button:disabled{opacity:.5;cursor:wait}\
input[type=file]{width:100%;margin:.5rem 0}\
.notice{padding:.75rem 1rem;border-radius:5px;margin:1rem 0}\
.notice.info{background:#e8f0fe}\
.notice.success{background:#e6f4ea}\
.notice.warning{background:#fef7e0}\
.notice.error{background:#fce8e6}\
.columns{display:flex;gap:1.5rem;flex-wrap:wrap}\
.col{flex:1 1 20rem}\
.col.wide{flex:1.2 1 24rem}\
section{background:#fff;border-radius:8px;padding:.5rem 1.25rem;margin-bottom:1rem}\
table{border-collapse:collapse}\
th,td{border:1px solid #dde;padding:.3rem .6rem;text-align:left;vertical-align:top}\
.msg{border-radius:8px;padding:.4rem 1rem;margin:.5rem 0;background:#fff}\
.msg.user{background:#e1f5fe}\
.msg p{color:#262730}\
.msg.pending{font-style:italic;color:#777}\
.role{font-weight:600;font-size:.8rem;color:#555}\
form.chat{display:flex;gap:.5rem;margin-top:1rem}\
form.chat input{flex:1;padding:.5rem;border-radius:5px;border:1px solid #ccd}\
form.chat button{width:auto}\
.doc-meta{color:#555}\
@media(max-width:48rem){body{flex-direction:column}aside{width:auto}}";

const PAGE_JS: &str = "\
document.querySelectorAll('form[data-wait]').forEach(function(f){\
f.addEventListener('submit',function(){\
f.querySelectorAll('button').forEach(function(b){b.disabled=true;b.textContent=f.dataset.wait;});\
});});";
