//! Layout of the text shown in the result window.

/// Joins the three results into the text shown in the result window.
pub fn format_report(original: &str, translation: &str, keywords: &str) -> String {
    format!(
        "Original: {}\nTradução: {}\n\nPalavras chave: {}",
        original, translation, keywords
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NO_ANALYSIS_SENTINEL;

    #[test]
    fn report_has_three_labeled_sections() {
        let report = format_report("HELLO", "OLÁ", NO_ANALYSIS_SENTINEL);
        assert_eq!(
            report,
            "Original: HELLO\nTradução: OLÁ\n\nPalavras chave: [SEM ANÁLISE RELEVANTE]"
        );
    }
}
