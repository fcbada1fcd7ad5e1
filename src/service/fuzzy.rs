//! Fuzzy title matching.

use strsim::normalized_levenshtein;

/// Similarity of two strings on a 0..=100 scale, ignoring case.
pub fn ratio(a: &str, b: &str) -> u8 {
    to_score(normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()))
}

/// Best [`ratio`] of the shorter string against equally long windows of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }

    let short: String = short.into_iter().collect();
    let best = long
        .windows(short.chars().count())
        .map(|window| normalized_levenshtein(&short, &window.iter().collect::<String>()))
        .fold(0.0_f64, f64::max);
    to_score(best)
}

/// [`ratio`] after sorting the words of both strings.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Weighted combination of the scorers above.
pub fn score(query: &str, choice: &str) -> u8 {
    let query = query.trim();
    let choice = choice.trim();
    if query.is_empty() || choice.is_empty() {
        return 0;
    }

    let base = ratio(query, choice);
    let token = (f64::from(token_sort_ratio(query, choice)) * 0.95) as u8;

    let (q, c) = (query.chars().count(), choice.chars().count());
    let len_ratio = q.max(c) as f64 / q.min(c) as f64;
    let partial = if len_ratio >= 1.5 {
        let scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
        (f64::from(partial_ratio(query, choice)) * scale) as u8
    } else {
        0
    };

    base.max(token).max(partial)
}

/// The best scoring choice, ties going to the earliest one.
pub fn best_match<'a, I>(query: &str, choices: I) -> Option<(&'a str, u8)>
where
    I: IntoIterator<Item = &'a str>,
{
    choices
        .into_iter()
        .map(|choice| (choice, score(query, choice)))
        .fold(None, |best: Option<(&str, u8)>, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })
}

fn sorted_tokens(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLES: [&str; 4] = [
        "Kingdom",
        "Fire Force",
        "Tales of Demons and Gods",
        "The Gamer",
    ];

    #[test]
    fn test_exact_match_scores_100() {
        assert_eq!(score("kingdom", "Kingdom"), 100);
    }

    #[test]
    fn test_typo_still_matches() {
        let (title, score) = best_match("kingdm", TITLES).unwrap();
        assert_eq!(title, "Kingdom");
        assert!(score >= 80, "score was {score}");
    }

    #[test]
    fn test_partial_match() {
        let (title, _) = best_match("demons and gods", TITLES).unwrap();
        assert_eq!(title, "Tales of Demons and Gods");
    }

    #[test]
    fn test_word_order_ignored() {
        assert!(token_sort_ratio("force fire", "Fire Force") == 100);
    }

    #[test]
    fn test_no_choices() {
        assert_eq!(best_match("kingdom", []), None);
        assert_eq!(score("", "Kingdom"), 0);
    }
}
