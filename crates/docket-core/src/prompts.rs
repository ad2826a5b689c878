use crate::types::ChatMessage;

pub const NOT_FOUND_ANSWER: &str =
    "I could not find an answer to your question in the provided document.";

const NO_HISTORY: &str = "(no earlier questions)";

pub const SUMMARY_TEMPLATE: &str = r#"**Role:** You are an AI assistant specializing in simplifying complex legal documents for a general audience. Your goal is to provide clarity, not legal advice.
**Task:** Analyze the following legal document and generate a concise, easy-to-understand summary.
**Instructions:**
1.  **Core Purpose:** Begin with a single sentence that clearly states the document's main purpose.
2.  **Key Parties:** Identify the primary parties involved and their roles.
3.  **Main Obligations:** In a short paragraph, outline the essential obligations of each party.
4.  **Language:** Use simple, plain English. Avoid jargon.

**Document Text:**
---
{DOCUMENT}
---
**Generated Summary:**"#;

pub const RISKS_TEMPLATE: &str = r#"**Role:** AI risk analyst for contracts.
**Task:** Analyze the document and categorize key clauses into three levels: high risk, key responsibilities, and standard provisions.

**Output Format:**
Use Markdown with the following specific categories and emoji indicators. For each point, provide a brief, simple explanation.

**⚠️ High-Priority Clauses & Risks:**
*   Identify clauses related to significant financial penalties, liabilities, non-standard termination conditions, or automatic renewals that could be detrimental to the signer.

**📝 Key User Responsibilities:**
*   List specific actions, duties, or obligations the signer must perform to comply with the agreement (e.g., payment schedules, notice requirements, confidentiality rules).

**✅ Standard & Benign Provisions:**
*   List common, low-risk clauses (e.g., governing law, severability, force majeure) that are standard in such agreements.

**Document Text:**
---
{DOCUMENT}
---
**Categorized Analysis:**"#;

pub const DASHBOARD_TEMPLATE: &str = r#"**Role:** You prepare one-page executive briefings on legal documents for busy decision makers. You do not give legal advice.
**Task:** Produce an executive dashboard for the document below.

**Output Format:**
A Markdown table with the columns "Item" and "Details", containing exactly these rows in this order:
| Item | Details |
|---|---|
| Document Type | |
| Parties | |
| Effective Date & Term | |
| Financial Terms | |
| Termination & Renewal | |
| Overall Risk Level | Low, Medium or High, followed by a one-line justification |

After the table, add a heading "**Top 3 Action Items:**" followed by a numbered list of the three most important things the signer should do or check before signing.

If the document does not address an item, write "Not specified". Do not guess.

**Document Text:**
---
{DOCUMENT}
---
**Executive Dashboard:**"#;

pub const QA_TEMPLATE: &str = r#"**Role:** You are a helpful AI assistant for document analysis.

**Core Task:** Answer user questions based *exclusively* on the provided document text.

**Special Instructions for Safety/Opinion Questions:**
If the user asks for a legal opinion, or asks if the document is "safe," "fair," or "good," follow these steps:
1.  State clearly that you cannot provide legal advice.
2.  Explain that safety and fairness depend on individual circumstances and legal interpretation.
3.  Direct the user to review the "Risk & Clause Breakdown" for potential issues identified in the document.
4.  Recommend consulting a qualified legal professional for a definitive opinion.

**Standard Q&A Instructions:**
For all other factual questions:
1.  Locate the exact information in the document text.
2.  Provide the answer based only on that text.
3.  Cite the source by including a relevant quote, prefixed with "**Source:**".
4.  If the answer is not found, state: "{NOT_FOUND}"

Use the earlier conversation only to understand what the user is referring to. Facts must still come from the document.

**Document Text:**
---
{DOCUMENT}
---
**Earlier Conversation:**
{HISTORY}

**User's Question:** "{QUESTION}"
**Factual Answer:**"#;

/// Substitute `{KEY}` placeholders in one left-to-right pass, so values are
/// never re-scanned for placeholders.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let hit = vars.iter().find_map(|(key, value)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(*key))
                .and_then(|t| t.strip_prefix('}'))
                .map(|after| (*value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            },
            None => {
                out.push('{');
                rest = &tail[1..];
            },
        }
    }
    out.push_str(rest);
    out
}

pub fn summary_prompt(document: &str) -> String {
    fill(SUMMARY_TEMPLATE, &[("DOCUMENT", document)])
}

pub fn risks_prompt(document: &str) -> String {
    fill(RISKS_TEMPLATE, &[("DOCUMENT", document)])
}

pub fn dashboard_prompt(document: &str) -> String {
    fill(DASHBOARD_TEMPLATE, &[("DOCUMENT", document)])
}

/// Render the last `max_messages` transcript entries as `[Role]: text` lines.
pub fn format_history(history: &[ChatMessage], max_messages: usize) -> String {
    let start = history.len().saturating_sub(max_messages);
    let recent = &history[start..];
    if recent.is_empty() {
        return NO_HISTORY.to_string();
    }
    recent
        .iter()
        .map(|m| format!("[{}]: {}", m.role.label(), m.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the Q&A prompt. `history` must not include the current question.
pub fn qa_prompt(
    document: &str,
    history: &[ChatMessage],
    question: &str,
    max_history: usize,
) -> String {
    let history = format_history(history, max_history);
    fill(
        QA_TEMPLATE,
        &[
            ("NOT_FOUND", NOT_FOUND_ANSWER),
            ("DOCUMENT", document),
            ("HISTORY", &history),
            ("QUESTION", question.trim()),
        ],
    )
}
