//! Document metadata: text statistics and the PDF page-count estimate.

/// Heuristic bytes-per-page for the PDF page estimate. The estimate is
/// deliberately approximate; exact counts would require parsing the document.
const PDF_BYTES_PER_PAGE: u64 = 50_000;

/// Character/word/line counts for plain-text formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    pub char_count: u64,
    pub word_count: u64,
    pub line_count: u64,
}

/// Compute text statistics over decoded content.
pub fn text_stats(content: &str) -> DocumentStats {
    DocumentStats {
        char_count: content.chars().count() as u64,
        word_count: content.split_whitespace().count() as u64,
        line_count: content.lines().count() as u64,
    }
}

/// Estimate a PDF's page count from its file size. Always at least 1.
pub fn estimate_pdf_page_count(size_bytes: u64) -> u32 {
    (size_bytes / PDF_BYTES_PER_PAGE).max(1).min(u32::MAX as u64) as u32
}

/// Whether a MIME type is treated as plain text for statistics purposes.
pub fn is_text_content_type(content_type: &str) -> bool {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    normalized.starts_with("text/") || normalized == "application/json"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_stats() {
        let stats = text_stats("hello world\nsecond line\n");
        assert_eq!(stats.word_count, 4);
        assert_eq!(stats.line_count, 2);
        assert_eq!(stats.char_count, 24);

        let empty = text_stats("");
        assert_eq!(empty.char_count, 0);
        assert_eq!(empty.word_count, 0);
        assert_eq!(empty.line_count, 0);
    }

    #[test]
    fn test_pdf_page_estimate() {
        assert_eq!(estimate_pdf_page_count(0), 1);
        assert_eq!(estimate_pdf_page_count(10_000), 1);
        assert_eq!(estimate_pdf_page_count(100_000), 2);
        assert_eq!(estimate_pdf_page_count(1_000_000), 20);
    }

    #[test]
    fn test_is_text_content_type() {
        assert!(is_text_content_type("text/plain"));
        assert!(is_text_content_type("text/markdown; charset=utf-8"));
        assert!(is_text_content_type("application/json"));
        assert!(!is_text_content_type("application/pdf"));
        assert!(!is_text_content_type("image/png"));
    }
}
