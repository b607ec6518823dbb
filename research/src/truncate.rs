/// Marker appended to the block cut at the budget boundary.
const MARKER: &str = "...";

/// Greedy word-budget truncation. Blocks are kept whole and in order while
/// the running total stays within `budget` words; the first block that would
/// overflow is cut to the remaining budget and marked, and everything after
/// it is dropped.
pub fn truncate_to_word_budget(blocks: &[String], budget: usize) -> Vec<String> {
    let mut kept = Vec::new();
    let mut used = 0usize;

    for block in blocks {
        let words: Vec<&str> = block.split_whitespace().collect();
        if used + words.len() <= budget {
            used += words.len();
            kept.push(block.clone());
        } else {
            let remaining = budget - used;
            if remaining > 0 {
                kept.push(format!("{}{}", words[..remaining].join(" "), MARKER));
            }
            break;
        }
    }

    kept
}
