use crate::models::{chunk_id, DocumentChunk};

/// Splits normalized text into bounded chunks.
///
/// Paragraphs (blank-line separated) are packed greedily into chunks of at
/// most `max_chunk_size` characters. A paragraph that alone exceeds the
/// bound is sub-split on sentence boundaries (`". "`); a single sentence
/// longer than the bound is emitted whole rather than cut mid-sentence.
/// After a sentence-split, the trailing under-full sentence group is carried
/// forward as the open accumulator so it can merge with the next paragraph.
///
/// Deterministic, order-preserving, side-effect free. Lengths are counted in
/// characters, not bytes, so multi-byte scripts chunk the same as ASCII.
pub fn split_into_chunks(text: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let paragraph_len = paragraph.chars().count();

        if paragraph_len > max_chunk_size {
            if !current.is_empty() {
                chunks.push(current.trim().to_string());
                current.clear();
                current_len = 0;
            }

            let mut carry = String::new();
            let mut carry_len = 0usize;

            for sentence in paragraph.split(". ") {
                let sentence_len = sentence.chars().count();

                if carry_len + sentence_len <= max_chunk_size {
                    carry.push_str(sentence);
                    carry.push_str(". ");
                    carry_len += sentence_len + 2;
                } else {
                    if !carry.is_empty() {
                        chunks.push(carry.trim().to_string());
                    }
                    carry = format!("{sentence}. ");
                    carry_len = sentence_len + 2;
                }
            }

            if !carry.is_empty() {
                current = carry;
                current_len = carry_len;
            }
            continue;
        }

        if current_len + paragraph_len <= max_chunk_size {
            current.push_str(paragraph);
            current.push_str("\n\n");
            current_len += paragraph_len + 2;
        } else {
            if !current.is_empty() {
                chunks.push(current.trim().to_string());
            }
            current = format!("{paragraph}\n\n");
            current_len = paragraph_len + 2;
        }
    }

    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

/// Attaches ids, indices, and totals to a document's chunk texts.
pub fn build_chunks(
    document_name: &str,
    source_path: &str,
    chunk_texts: Vec<String>,
) -> Vec<DocumentChunk> {
    let total_chunks = chunk_texts.len();

    chunk_texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| DocumentChunk {
            chunk_id: chunk_id(document_name, index),
            document_name: document_name.to_string(),
            source_path: source_path.to_string(),
            chunk_index: index,
            total_chunks,
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_small_paragraphs_stay_one_chunk() {
        let chunks = split_into_chunks("Para one.\n\nPara two.", 500);
        assert_eq!(chunks, vec!["Para one.\n\nPara two.".to_string()]);
    }

    #[test]
    fn paragraph_without_sentence_breaks_stays_whole() {
        let paragraph = "가".repeat(1200);
        let chunks = split_into_chunks(&paragraph, 500);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].chars().count() > 500);
    }

    #[test]
    fn every_chunk_respects_the_bound_or_is_one_atomic_sentence() {
        let text = format!(
            "{}. {}. {}.\n\nshort paragraph\n\n{}",
            "a".repeat(300),
            "b".repeat(300),
            "c".repeat(300),
            "d".repeat(40),
        );

        for chunk in split_into_chunks(&text, 500) {
            let length = chunk.chars().count();
            let has_inner_sentence_break = chunk.trim_end_matches('.').contains(". ");
            assert!(
                length <= 501 || !has_inner_sentence_break,
                "chunk of {length} chars should be bounded or atomic"
            );
        }
    }

    #[test]
    fn paragraph_order_is_preserved() {
        let text = "first\n\nsecond\n\nthird\n\nfourth";
        let chunks = split_into_chunks(text, 14);
        let rejoined = chunks.join("\n\n");
        let first = rejoined.find("first").unwrap();
        let second = rejoined.find("second").unwrap();
        let third = rejoined.find("third").unwrap();
        let fourth = rejoined.find("fourth").unwrap();
        assert!(first < second && second < third && third < fourth);
    }

    #[test]
    fn oversized_paragraph_is_split_on_sentence_boundaries() {
        let text = format!("{}. {}. tail", "x".repeat(280), "y".repeat(280));
        let chunks = split_into_chunks(&text, 300);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with(&"x".repeat(280)));
        assert!(chunks[1].starts_with(&"y".repeat(280)));
        assert!(chunks[1].ends_with("tail."));
    }

    #[test]
    fn trailing_sentence_group_merges_with_next_paragraph() {
        let text = format!("{}. tail sentence\n\nnext paragraph", "x".repeat(290));
        let chunks = split_into_chunks(&text, 300);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].contains("tail sentence"));
        assert!(chunks[1].contains("next paragraph"));
    }

    #[test]
    fn blank_paragraphs_are_discarded() {
        let chunks = split_into_chunks("one\n\n   \n\ntwo", 100);
        assert_eq!(chunks, vec!["one\n\ntwo".to_string()]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(split_into_chunks("", 500).is_empty());
        assert!(split_into_chunks("   \n\n  ", 500).is_empty());
    }

    #[test]
    fn chunk_records_carry_ids_and_totals() {
        let chunks = build_chunks(
            "deep_learning",
            "/data/raw/deep_learning.md",
            vec!["first chunk".to_string(), "second chunk".to_string()],
        );

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_id, "deep_learning_chunk_0");
        assert_eq!(chunks[1].chunk_id, "deep_learning_chunk_1");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].total_chunks, 2);
        assert_eq!(chunks[1].document_name, "deep_learning");
    }
}
