//! Ranking-text parsing and aggregation.
//!
//! Judges are asked to end their verdict with a `FINAL RANKING:` section,
//! but free-form LLM output cannot be trusted to comply. Extraction
//! degrades gracefully through three levels and never fails:
//!
//! 1. numbered entries (`N. Response X`) after a `FINAL RANKING:` header
//! 2. any `Response X` mention after the header, in order
//! 3. no header at all: `Response X` mentions anywhere in the text
//!
//! An unparseable verdict yields an empty list, not an error. Pure text
//! logic with no I/O and no session management.

use crate::deliberation::value_objects::AggregateRanking;

const RANKING_HEADER: &str = "final ranking:";
const LABEL_PREFIX: &str = "response ";

/// Assign anonymous labels ("Response A", "Response B", …) to candidates
/// in their original order. Anonymity prevents position/identity bias in
/// the judges.
pub fn assign_labels(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("Response {}", (b'A' + i as u8) as char))
        .collect()
}

/// Extract an ordered label list from one judge's free-form verdict.
pub fn parse_ranking(text: &str) -> Vec<String> {
    let lower = text.to_ascii_lowercase();

    if let Some(idx) = lower.find(RANKING_HEADER) {
        let section = &lower[idx + RANKING_HEADER.len()..];

        let numbered = parse_numbered_entries(section);
        if !numbered.is_empty() {
            return numbered;
        }
        // Header present but no numbered list: take any mention after it
        return find_label_mentions(section);
    }

    // No header at all: scan the entire text as a last resort
    find_label_mentions(&lower)
}

/// Parse `N. Response X` / `N) Response X` entries, one per line.
fn parse_numbered_entries(section: &str) -> Vec<String> {
    let mut labels = Vec::new();
    for line in section.lines() {
        let trimmed = line.trim_start();
        let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            continue;
        }
        let rest = &trimmed[digits..];
        if !rest.starts_with('.') && !rest.starts_with(')') {
            continue;
        }
        // Labels may be wrapped in markdown ("1. **Response B**"), so take
        // the first mention anywhere in the entry rather than a strict form.
        if let Some(label) = find_label_mentions(rest).into_iter().next()
            && !labels.contains(&label)
        {
            labels.push(label);
        }
    }
    labels
}

/// Ordered, de-duplicated `Response X` mentions in already-lowercased text.
fn find_label_mentions(lower: &str) -> Vec<String> {
    let mut labels = Vec::new();
    let mut rest = lower;

    while let Some(idx) = rest.find(LABEL_PREFIX) {
        let after = &rest[idx + LABEL_PREFIX.len()..];
        let mut chars = after.chars();
        if let Some(letter) = chars.next()
            && letter.is_ascii_lowercase()
            && !chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        {
            let label = format!("Response {}", letter.to_ascii_uppercase());
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        rest = &rest[idx + LABEL_PREFIX.len()..];
    }

    labels
}

/// Aggregate judge rankings into a per-model mean rank.
///
/// `labeled` pairs each anonymous label with the model it stands for, in
/// assignment order. For every model, its 1-based position is collected
/// from every ranking that mentions it; positions are averaged (rounded to
/// 2 decimals) and the result is sorted ascending, lower mean rank first.
/// Models never mentioned by any judge are omitted.
pub fn aggregate_rankings(
    labeled: &[(String, String)],
    rankings: &[Vec<String>],
) -> Vec<AggregateRanking> {
    let mut aggregate = Vec::new();

    for (label, model) in labeled {
        let positions: Vec<usize> = rankings
            .iter()
            .filter_map(|ranking| ranking.iter().position(|l| l == label).map(|p| p + 1))
            .collect();
        if positions.is_empty() {
            continue;
        }
        let mean = positions.iter().sum::<usize>() as f64 / positions.len() as f64;
        aggregate.push(AggregateRanking {
            model: model.clone(),
            average_rank: (mean * 100.0).round() / 100.0,
            rankings_count: positions.len(),
        });
    }

    aggregate.sort_by(|a, b| {
        a.average_rank
            .partial_cmp(&b.average_rank)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.model.cmp(&b.model))
    });
    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== parse_ranking Tests ====================

    #[test]
    fn numbered_list_after_header() {
        let text = "Both responses are solid.\nFINAL RANKING:\n1. Response B\n2. Response A\n";
        assert_eq!(parse_ranking(text), vec!["Response B", "Response A"]);
    }

    #[test]
    fn header_is_case_insensitive() {
        let text = "verdict below\nFinal Ranking:\n1. response c\n2. response a\n3. response b";
        assert_eq!(
            parse_ranking(text),
            vec!["Response C", "Response A", "Response B"]
        );
    }

    #[test]
    fn markdown_wrapped_entries() {
        let text = "FINAL RANKING:\n1. **Response B** — strongest\n2) *Response A*";
        assert_eq!(parse_ranking(text), vec!["Response B", "Response A"]);
    }

    #[test]
    fn header_without_numbers_falls_back_to_mentions() {
        let text =
            "FINAL RANKING:\nI'd put Response C first, then Response A, and Response B last.";
        assert_eq!(
            parse_ranking(text),
            vec!["Response C", "Response A", "Response B"]
        );
    }

    #[test]
    fn no_header_scans_whole_text() {
        let text = "I liked Response A best, then Response B";
        assert_eq!(parse_ranking(text), vec!["Response A", "Response B"]);
    }

    #[test]
    fn mentions_before_header_are_ignored_when_header_exists() {
        let text = "Response A rambles. Response B is tight.\nFINAL RANKING:\n1. Response B\n2. Response A";
        assert_eq!(parse_ranking(text), vec!["Response B", "Response A"]);
    }

    #[test]
    fn duplicate_mentions_are_deduped() {
        let text = "Response A... again Response A, then Response B";
        assert_eq!(parse_ranking(text), vec!["Response A", "Response B"]);
    }

    #[test]
    fn label_requires_word_boundary() {
        // "Response Ad" is prose, not a label
        let text = "The Response Ad campaign. I prefer Response B.";
        assert_eq!(parse_ranking(text), vec!["Response B"]);
    }

    #[test]
    fn unparseable_text_yields_empty_list() {
        assert!(parse_ranking("no verdict here").is_empty());
        assert!(parse_ranking("").is_empty());
    }

    // ==================== assign_labels Tests ====================

    #[test]
    fn labels_follow_original_order() {
        assert_eq!(
            assign_labels(3),
            vec!["Response A", "Response B", "Response C"]
        );
        assert!(assign_labels(0).is_empty());
    }

    // ==================== aggregate_rankings Tests ====================

    fn labeled(models: &[&str]) -> Vec<(String, String)> {
        assign_labels(models.len())
            .into_iter()
            .zip(models.iter().map(|m| m.to_string()))
            .collect()
    }

    #[test]
    fn symmetric_rankings_average_out() {
        let labeled = labeled(&["claude", "codex"]);
        let rankings = vec![
            vec!["Response A".to_string(), "Response B".to_string()],
            vec!["Response B".to_string(), "Response A".to_string()],
        ];
        let aggregate = aggregate_rankings(&labeled, &rankings);
        assert_eq!(aggregate.len(), 2);
        for entry in &aggregate {
            assert_eq!(entry.average_rank, 1.5);
            assert_eq!(entry.rankings_count, 2);
        }
    }

    #[test]
    fn unmentioned_models_are_omitted() {
        let labeled = labeled(&["claude", "codex", "gemini"]);
        let rankings = vec![vec!["Response A".to_string(), "Response B".to_string()]];
        let aggregate = aggregate_rankings(&labeled, &rankings);
        assert_eq!(aggregate.len(), 2);
        assert!(!aggregate.iter().any(|a| a.model == "gemini"));
    }

    #[test]
    fn sorted_ascending_by_mean_rank() {
        let labeled = labeled(&["claude", "codex"]);
        let rankings = vec![
            vec!["Response B".to_string(), "Response A".to_string()],
            vec!["Response B".to_string(), "Response A".to_string()],
        ];
        let aggregate = aggregate_rankings(&labeled, &rankings);
        assert_eq!(aggregate[0].model, "codex");
        assert_eq!(aggregate[0].average_rank, 1.0);
        assert_eq!(aggregate[1].average_rank, 2.0);
    }

    #[test]
    fn mean_rank_rounds_to_two_decimals() {
        let labeled = labeled(&["claude"]);
        let rankings = vec![
            vec!["Response A".to_string()],
            vec!["x".to_string(), "x".to_string(), "Response A".to_string()],
            vec!["x".to_string(), "Response A".to_string()],
        ];
        // positions 1, 3, 2 → mean 2.0; and 1, 3 → 2.0; craft a thirds case
        let aggregate = aggregate_rankings(&labeled, &rankings);
        assert_eq!(aggregate[0].average_rank, 2.0);

        let rankings = vec![
            vec!["Response A".to_string()],
            vec!["x".to_string(), "Response A".to_string()],
            vec!["x".to_string(), "Response A".to_string()],
        ];
        // positions 1, 2, 2 → 1.666… → 1.67
        let aggregate = aggregate_rankings(&labeled, &rankings);
        assert_eq!(aggregate[0].average_rank, 1.67);
    }

    #[test]
    fn empty_rankings_produce_empty_aggregate() {
        let labeled = labeled(&["claude", "codex"]);
        assert!(aggregate_rankings(&labeled, &[]).is_empty());
    }
}
