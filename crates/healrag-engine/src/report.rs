use std::fmt;

use healrag_core::types::QueryResponse;

const WIDTH: usize = 60;

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Human-readable before/after view of a response.
pub struct Report<'a>(pub &'a QueryResponse);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        let rule = "-".repeat(WIDTH);
        writeln!(f, "Self-Healing Retrieval Query")?;
        writeln!(f, "{}", "=".repeat(WIDTH))?;
        writeln!(f, "Query: {}", r.query)?;
        writeln!(f, "Trust Score (before): {:.3}", r.trust_score_before)?;
        writeln!(f, "Trust Score (after): {:.3}", r.trust_score_after)?;
        writeln!(f, "Healing Triggered: {}", yes_no(r.healing_triggered))?;
        writeln!(f, "Healing Successful: {}", yes_no(r.healing_successful))?;
        writeln!(f, "\nSources Used:")?;
        for source in &r.sources_used {
            writeln!(f, "  - {source}")?;
        }
        writeln!(f, "\n{rule}\nBEFORE (Base Knowledge Only):\n{rule}\n{}", r.before_answer)?;
        writeln!(f, "\n{rule}\nAFTER (With Self-Healing):\n{rule}\n{}", r.answer)
    }
}

pub fn format_report(response: &QueryResponse) -> String {
    Report(response).to_string()
}
