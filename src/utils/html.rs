use ammonia;

/// Sanitizes free text imported from a spreadsheet before it is stored.
///
/// Safe markup such as <b> or <p> is kept; scripts, iframes and event-handler
/// attributes are removed. Surrounding whitespace is trimmed.
pub fn clean_imported_text(input: &str) -> String {
    ammonia::clean(input).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_removed() {
        let cleaned = clean_imported_text("Quanto é 2+2?<script>alert(1)</script>");
        assert_eq!(cleaned, "Quanto é 2+2?");
    }

    #[test]
    fn test_safe_markup_is_kept() {
        let cleaned = clean_imported_text("  <b>Leia</b> o texto  ");
        assert_eq!(cleaned, "<b>Leia</b> o texto");
    }
}
