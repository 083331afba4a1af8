use crate::normalize::strip_front_matter;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Candidates scoring at or below this are dropped from ranked results.
pub const MIN_RELEVANCE: f64 = 0.1;

/// Default line cap for snippet extraction.
pub const DEFAULT_SNIPPET_LINES: usize = 50;

/// Fixed AI/ML vocabulary for the domain bonus, Korean and English.
const DOMAIN_KEYWORDS: [&str; 27] = [
    "ai",
    "artificial",
    "intelligence",
    "인공지능",
    "machine",
    "learning",
    "머신러닝",
    "기계학습",
    "ml",
    "deep",
    "deeplearning",
    "딥러닝",
    "neural",
    "network",
    "신경망",
    "cnn",
    "rnn",
    "lstm",
    "gru",
    "transformer",
    "gpt",
    "reinforcement",
    "강화학습",
    "alphago",
    "알파고",
    "supervised",
    "지도학습",
];

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\b\w+\b").expect("static pattern compiles"))
}

/// Heuristic relevance between a query and a short title, in `[0.0, 1.0]`.
///
/// Three additive components, each capped: substring containment in either
/// direction (0.8), word-overlap ratio scaled by 0.6, and a flat 0.3 when
/// both sides use the fixed domain vocabulary. Empty strings contribute
/// nothing, so an empty query scores 0.0 against any title.
pub fn calculate_relevance_score(query: &str, title: &str) -> f64 {
    let query_lower = query.to_lowercase();
    let title_lower = title.to_lowercase();

    let mut score = 0.0;

    if !query_lower.is_empty()
        && !title_lower.is_empty()
        && (query_lower.contains(&title_lower) || title_lower.contains(&query_lower))
    {
        score += 0.8;
    }

    let query_words: HashSet<&str> = word_pattern()
        .find_iter(&query_lower)
        .map(|word| word.as_str())
        .collect();
    let title_words: HashSet<&str> = word_pattern()
        .find_iter(&title_lower)
        .map(|word| word.as_str())
        .collect();

    if !query_words.is_empty() && !title_words.is_empty() {
        let common = query_words.intersection(&title_words).count();
        let word_score = common as f64 / query_words.len().max(title_words.len()) as f64;
        score += word_score * 0.6;
    }

    let query_has_domain_term = query_lower
        .split_whitespace()
        .any(|token| DOMAIN_KEYWORDS.contains(&token));
    let title_has_domain_term = title_lower
        .split_whitespace()
        .any(|token| DOMAIN_KEYWORDS.contains(&token));

    if query_has_domain_term && title_has_domain_term {
        score += 0.3;
    }

    score.min(1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTitle {
    pub title: String,
    pub score: f64,
}

/// Scores every candidate title against the query, drops anything at or
/// below [`MIN_RELEVANCE`], and sorts descending. The sort is stable, so
/// candidate insertion order breaks ties.
pub fn rank_titles<'a>(query: &str, titles: impl IntoIterator<Item = &'a str>) -> Vec<ScoredTitle> {
    let mut scored: Vec<ScoredTitle> = titles
        .into_iter()
        .map(|title| ScoredTitle {
            title: title.to_string(),
            score: calculate_relevance_score(query, title),
        })
        .filter(|candidate| candidate.score > MIN_RELEVANCE)
        .collect();

    scored.sort_by(|left, right| right.score.total_cmp(&left.score));
    scored
}

/// Extracts up to `max_lines` lines related to the query from a document
/// body: front matter is dropped, each line sharing a query token pulls in
/// two lines of leading and seven of trailing context, and a query with no
/// matching line falls back to the head of the document.
pub fn extract_relevant_lines(content: &str, query: &str, max_lines: usize) -> String {
    let content = strip_front_matter(content);
    let lines: Vec<&str> = content.split('\n').collect();

    let query_lower = query.to_lowercase();
    let needles: Vec<&str> = query_lower.split_whitespace().collect();

    let mut relevant: Vec<&str> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let line_lower = line.to_lowercase();

        if needles.iter().any(|needle| line_lower.contains(needle)) {
            let start = index.saturating_sub(2);
            let end = (index + 8).min(lines.len());
            relevant.extend(&lines[start..end]);

            if relevant.len() >= max_lines {
                break;
            }
        }
    }

    if relevant.is_empty() {
        relevant = lines.iter().take(max_lines).copied().collect();
    }

    relevant
        .into_iter()
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n")
}
