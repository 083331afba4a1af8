use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    html_tag: Regex,
    header: Regex,
    bold_star: Regex,
    italic_star: Regex,
    bold_underscore: Regex,
    italic_underscore: Regex,
    link: Regex,
    bracket: Regex,
    fenced_code: Regex,
    inline_code: Regex,
    block_quote: Regex,
    horizontal_rule: Regex,
    bullet_marker: Regex,
    numbered_marker: Regex,
    display_math: Regex,
    inline_math: Regex,
    citation_single: Regex,
    citation_pair: Regex,
    citation_range: Regex,
    symbol_noise: Regex,
    blank_runs: Regex,
    space_runs: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        html_tag: compile(r"<[^>]+>"),
        header: compile(r"(?m)^#{1,6}\s+"),
        bold_star: compile(r"\*\*(.*?)\*\*"),
        italic_star: compile(r"\*(.*?)\*"),
        bold_underscore: compile(r"__(.*?)__"),
        italic_underscore: compile(r"_(.*?)_"),
        link: compile(r"\[([^\]]+)\]\([^)]+\)"),
        bracket: compile(r"\[([^\]]+)\]"),
        fenced_code: compile(r"(?s)```.*?```"),
        inline_code: compile(r"`([^`]+)`"),
        block_quote: compile(r"(?m)^>\s*"),
        horizontal_rule: compile(r"(?m)^[-*_]{3,}$"),
        bullet_marker: compile(r"(?m)^[-*+]\s+"),
        numbered_marker: compile(r"(?m)^\d+\.\s+"),
        display_math: compile(r"(?s)\$\$.*?\$\$"),
        inline_math: compile(r"\$.*?\$"),
        citation_single: compile(r"\[\d+\]"),
        citation_pair: compile(r"\[\d+,\s*\d+\]"),
        citation_range: compile(r"\[\d+-\d+\]"),
        symbol_noise: compile(r"[^\w\s가-힣.,!?;:()\-]"),
        blank_runs: compile(r"\n{3,}"),
        space_runs: compile(r" +"),
    })
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

/// Headings that open a boilerplate section. Matched case-insensitively as a
/// substring of the line, so both "## 참고 문헌" and "References" forms hit.
const BOILERPLATE_KEYWORDS: [&str; 18] = [
    "참고 문헌",
    "참고문헌",
    "각주",
    "외부 링크",
    "외부링크",
    "같이 보기",
    "같이보기",
    "바깥 링크",
    "바깥링크",
    "더 보기",
    "더보기",
    "참고 자료",
    "참고자료",
    "references",
    "bibliography",
    "footnotes",
    "external links",
    "see also",
];

/// A line containing one of these ends a boilerplate skip even without a
/// heading marker, since plain-text sources lose their `#` prefixes.
const MAIN_SECTION_KEYWORDS: [&str; 12] = [
    "개요",
    "정의",
    "역사",
    "특징",
    "원리",
    "방법",
    "overview",
    "definition",
    "history",
    "characteristics",
    "principles",
    "methods",
];

/// Wiki chrome that leaks into scraped article bodies.
const NOISE_KEYWORDS: [&str; 11] = [
    "편집",
    "edit",
    "토론",
    "talk",
    "모니터링",
    "monitoring",
    "보호",
    "protection",
    "분류",
    "category",
    "카테고리",
];

pub fn strip_front_matter(text: &str) -> String {
    if !text.starts_with("---") {
        return text.to_string();
    }

    let parts: Vec<&str> = text.splitn(3, "---").collect();
    if parts.len() == 3 {
        parts[2].trim().to_string()
    } else {
        text.to_string()
    }
}

pub fn strip_html_tags(text: &str) -> String {
    patterns().html_tag.replace_all(text, "").to_string()
}

/// `[n]`, `[n,m]`, `[n-m]`. Runs before bracket unwrapping so the digits
/// don't survive as bare numbers.
pub fn strip_citation_markers(text: &str) -> String {
    let patterns = patterns();
    let text = patterns.citation_pair.replace_all(text, "");
    let text = patterns.citation_range.replace_all(&text, "");
    patterns.citation_single.replace_all(&text, "").to_string()
}

/// Keeps the visible text: emphasis unwrapped, links reduced to their
/// label, code fences dropped entirely.
pub fn strip_markdown_syntax(text: &str) -> String {
    let patterns = patterns();
    let text = patterns.header.replace_all(text, "");
    let text = patterns.bold_star.replace_all(&text, "$1");
    let text = patterns.italic_star.replace_all(&text, "$1");
    let text = patterns.bold_underscore.replace_all(&text, "$1");
    let text = patterns.italic_underscore.replace_all(&text, "$1");
    let text = patterns.link.replace_all(&text, "$1");
    let text = patterns.bracket.replace_all(&text, "$1");
    let text = patterns.fenced_code.replace_all(&text, "");
    let text = patterns.inline_code.replace_all(&text, "$1");
    let text = patterns.block_quote.replace_all(&text, "");
    let text = patterns.horizontal_rule.replace_all(&text, "");
    let text = patterns.bullet_marker.replace_all(&text, "");
    patterns.numbered_marker.replace_all(&text, "").to_string()
}

pub fn strip_math(text: &str) -> String {
    let patterns = patterns();
    let text = patterns.display_math.replace_all(text, "");
    let mut text = patterns.inline_math.replace_all(&text, "").to_string();

    const SYMBOL_NAMES: [(&str, &str); 29] = [
        ("α", "alpha"),
        ("β", "beta"),
        ("γ", "gamma"),
        ("δ", "delta"),
        ("ε", "epsilon"),
        ("ζ", "zeta"),
        ("η", "eta"),
        ("θ", "theta"),
        ("ι", "iota"),
        ("κ", "kappa"),
        ("λ", "lambda"),
        ("μ", "mu"),
        ("ν", "nu"),
        ("ξ", "xi"),
        ("π", "pi"),
        ("ρ", "rho"),
        ("σ", "sigma"),
        ("τ", "tau"),
        ("υ", "upsilon"),
        ("φ", "phi"),
        ("χ", "chi"),
        ("ψ", "psi"),
        ("ω", "omega"),
        ("∞", "무한"),
        ("∂", "편미분"),
        ("∇", "나블라"),
        ("∑", "합계"),
        ("∏", "곱"),
        ("∫", "적분"),
    ];

    for (symbol, name) in SYMBOL_NAMES {
        if text.contains(symbol) {
            text = text.replace(symbol, name);
        }
    }

    text
}

/// From a line containing a boilerplate heading keyword until the next
/// `##` heading or a line naming a main section.
pub fn drop_boilerplate_sections(text: &str) -> String {
    let mut kept = Vec::new();
    let mut skipping = false;

    for line in text.lines() {
        let line_lower = line.trim().to_lowercase();

        if BOILERPLATE_KEYWORDS
            .iter()
            .any(|keyword| line_lower.contains(keyword))
        {
            skipping = true;
            continue;
        }

        if skipping
            && (line.trim().starts_with("##")
                || MAIN_SECTION_KEYWORDS
                    .iter()
                    .any(|keyword| line_lower.contains(keyword)))
        {
            skipping = false;
        }

        if !skipping {
            kept.push(line);
        }
    }

    kept.join("\n")
}

pub fn drop_noise_sections(text: &str) -> String {
    let mut kept = Vec::new();
    let mut skipping = false;

    for line in text.lines() {
        let line_lower = line.trim().to_lowercase();

        if NOISE_KEYWORDS
            .iter()
            .any(|keyword| line_lower.contains(keyword))
        {
            skipping = true;
            continue;
        }

        if line.trim().starts_with("##") {
            skipping = false;
        }

        if !skipping {
            kept.push(line);
        }
    }

    kept.join("\n")
}

/// Final pass: 3+ newlines collapse to exactly 2, space runs to 1, ends
/// trimmed.
pub fn collapse_whitespace(text: &str) -> String {
    let patterns = patterns();
    let text = patterns.blank_runs.replace_all(text, "\n\n");
    let text = patterns.space_runs.replace_all(&text, " ");
    text.trim().to_string()
}

fn strip_symbol_noise(text: &str) -> String {
    patterns().symbol_noise.replace_all(text, "").to_string()
}

/// Full prose normalization: markup, math, citations, and boilerplate all
/// removed. Never fails; ill-formed markup is passed through as plain text.
pub fn normalize_plain_text(raw: &str) -> String {
    let text = strip_front_matter(raw);
    let text = strip_html_tags(&text);
    let text = strip_citation_markers(&text);
    let text = drop_boilerplate_sections(&text);
    let text = drop_noise_sections(&text);
    let text = strip_markdown_syntax(&text);
    let text = strip_math(&text);
    let text = strip_symbol_noise(&text);
    collapse_whitespace(&text)
}

/// Lighter normalization that keeps heading structure for markdown-oriented
/// consumers.
pub fn normalize_markdown(raw: &str) -> String {
    let text = strip_front_matter(raw);
    let text = strip_html_tags(&text);
    let text = strip_citation_markers(&text);
    let text = drop_boilerplate_sections(&text);
    let patterns = patterns();
    let text = patterns.link.replace_all(&text, "$1");
    let text = patterns.fenced_code.replace_all(&text, "");
    let text = patterns.inline_code.replace_all(&text, "$1");
    collapse_whitespace(&text)
}

/// Pluggable normalization strategy; the orchestrator takes one of these
/// instead of shipping a markdown and a plain-text copy of itself.
pub trait TextNormalizer {
    fn normalize(&self, raw: &str) -> String;
    fn default_chunk_size(&self) -> usize;
    fn source_tag(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextNormalizer;

impl TextNormalizer for PlainTextNormalizer {
    fn normalize(&self, raw: &str) -> String {
        normalize_plain_text(raw)
    }

    fn default_chunk_size(&self) -> usize {
        1000
    }

    fn source_tag(&self) -> &'static str {
        "text"
    }
}

/// Keeps headings for consumers that want document structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownNormalizer;

impl TextNormalizer for MarkdownNormalizer {
    fn normalize(&self, raw: &str) -> String {
        normalize_markdown(raw)
    }

    fn default_chunk_size(&self) -> usize {
        500
    }

    fn source_tag(&self) -> &'static str {
        "markdown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_tags_are_removed() {
        let input = "인공지능은 <b>중요한</b> 기술이다<br/>";
        assert_eq!(strip_html_tags(input), "인공지능은 중요한 기술이다");
    }

    #[test]
    fn markdown_emphasis_keeps_inner_text() {
        let input = "**딥러닝**은 *기계학습*의 한 분야이다";
        assert_eq!(
            strip_markdown_syntax(input),
            "딥러닝은 기계학습의 한 분야이다"
        );
    }

    #[test]
    fn links_reduce_to_visible_text() {
        let input = "[신경망](https://example.org/nn) 참조";
        assert_eq!(strip_markdown_syntax(input), "신경망 참조");
    }

    #[test]
    fn fenced_code_is_deleted_and_inline_code_unwrapped() {
        let input = "before\n```\nlet x = 1;\n```\nafter `model.fit()` done";
        let stripped = strip_markdown_syntax(input);
        assert!(!stripped.contains("let x"));
        assert!(stripped.contains("model.fit()"));
    }

    #[test]
    fn citation_markers_are_deleted() {
        let input = "결과가 보고되었다[1]. 후속 연구[2,3]와 개관[4-7] 참조.";
        let stripped = strip_citation_markers(input);
        assert_eq!(stripped, "결과가 보고되었다. 후속 연구와 개관 참조.");
    }

    #[test]
    fn math_segments_are_deleted() {
        let input = "손실은 $L = -\\sum p \\log q$ 로 정의된다. $$E = mc^2$$ 끝.";
        let stripped = strip_math(input);
        assert!(!stripped.contains("mc^2"));
        assert!(!stripped.contains("\\sum"));
        assert!(stripped.contains("손실은"));
    }

    #[test]
    fn greek_symbols_are_spelled_out() {
        assert_eq!(strip_math("학습률 α와 β"), "학습률 alpha와 beta");
    }

    #[test]
    fn boilerplate_section_dropped_until_main_section() {
        let input = "본문 내용\n## 같이 보기\n관련 항목 1\n관련 항목 2\n## 역사\n역사 내용";
        let cleaned = drop_boilerplate_sections(input);
        assert!(cleaned.contains("본문 내용"));
        assert!(!cleaned.contains("관련 항목"));
        assert!(cleaned.contains("역사 내용"));
    }

    #[test]
    fn boilerplate_keywords_match_case_insensitively() {
        let input = "body\n## See Also\ndropped line\n## Overview\nkept line";
        let cleaned = drop_boilerplate_sections(input);
        assert!(!cleaned.contains("dropped line"));
        assert!(cleaned.contains("kept line"));
    }

    #[test]
    fn front_matter_block_is_dropped() {
        let input = "---\ntitle: 딥러닝\ndate: 2024-01-01\n---\n본문 시작";
        assert_eq!(strip_front_matter(input), "본문 시작");
    }

    #[test]
    fn text_without_front_matter_is_untouched() {
        let input = "그냥 본문";
        assert_eq!(strip_front_matter(input), input);
    }

    #[test]
    fn whitespace_collapses_newlines_and_spaces() {
        let input = "  a    b\n\n\n\n\nc  ";
        assert_eq!(collapse_whitespace(input), "a b\n\nc");
    }

    #[test]
    fn plain_text_normalization_is_idempotent() {
        let raw = "# 딥러닝\n\n**딥러닝**은 신경망[1] 기반이다. $y = wx$\n\n## 같이 보기\n- 머신러닝\n";
        let once = normalize_plain_text(raw);
        let twice = normalize_plain_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn markdown_mode_keeps_headings() {
        let raw = "# 제목\n\n본문 내용[1]\n\n## 각주\n각주 내용";
        let cleaned = normalize_markdown(raw);
        assert!(cleaned.contains("# 제목"));
        assert!(!cleaned.contains("각주 내용"));
        assert!(!cleaned.contains("[1]"));
    }

    #[test]
    fn strategy_defaults_differ_by_mode() {
        assert_eq!(PlainTextNormalizer.default_chunk_size(), 1000);
        assert_eq!(MarkdownNormalizer.default_chunk_size(), 500);
    }

    #[test]
    fn ill_formed_markup_degrades_to_plain_text() {
        let raw = "unclosed **bold and `code with $ sign";
        let cleaned = normalize_plain_text(raw);
        assert!(cleaned.contains("unclosed"));
    }
}
