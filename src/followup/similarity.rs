use crate::render::strip_tags;

const WINDOW: usize = 5;

/// Share of the output covered by five-word runs that also appear verbatim in the
/// source, as a 0..=100 score.
///
/// Every matching window adds five words, so overlapping windows count more than
/// once and long copied passages saturate at 100. It is a coarse signal, not a
/// duplication percentage.
pub fn score_similarity(output_html: &str, source_text: &str) -> u8 {
    let output = strip_tags(output_html).to_lowercase();
    let source = source_text.to_lowercase();
    let words: Vec<&str> = output.split_whitespace().collect();
    if words.is_empty() || source.trim().is_empty() {
        return 0;
    }

    let matching_words = words
        .windows(WINDOW)
        .filter(|w| source.contains(&w.join(" ")))
        .count()
        * WINDOW;

    let score = (100.0 * matching_words as f64 / words.len() as f64).round();
    score.min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrelated_text_scores_zero() {
        assert_eq!(
            score_similarity("completely unrelated sentence here now", "totally different words entirely"),
            0
        );
    }

    #[test]
    fn verbatim_copy_clamps_to_one_hundred() {
        let passage = "the city council voted on tuesday to approve a new budget that raises spending on parks and libraries by ten percent";
        let html = format!("<p>{}</p>", passage.to_uppercase());
        assert_eq!(score_similarity(&html, passage), 100);
    }

    #[test]
    fn partial_overlap_counts_each_window() {
        // ten words, the first six copied: windows 0 and 1 match
        let output = "one two three four five six x y z w";
        let source = "one two three four five six seven";
        assert_eq!(score_similarity(output, source), 100);

        // twenty words, one matching window
        let output = "a b c d e q r s t u v w x y z aa bb cc dd ee";
        assert_eq!(score_similarity(output, "a b c d e"), 25);
    }

    #[test]
    fn short_or_empty_inputs_score_zero() {
        assert_eq!(score_similarity("", "anything at all here"), 0);
        assert_eq!(score_similarity("<p></p>", "anything"), 0);
        assert_eq!(score_similarity("four words only here", "four words only here"), 0);
        assert_eq!(score_similarity("some output text goes here", "  "), 0);
    }
}
