//! Token lookup shared by every anatomy and item resolver
//!
//! Order: numeric id, exact name, then prefix of the name or of any word in
//! the name ("arm" finds "left upper arm"). First match wins at each stage.

/// How a token matched its candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    Id,
    ExactName,
    PartialName,
}

/// Find the candidate a token refers to.
///
/// `candidates` yields `(id, name)` pairs in a stable order; lookup is pure and
/// gives the same answer for the same candidates and token.
pub fn find_by_token<'a, I>(candidates: I, token: &str) -> Option<(u32, MatchReason)>
where
    I: IntoIterator<Item = (u32, &'a str)>,
    I::IntoIter: Clone,
{
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let candidates = candidates.into_iter();

    if let Ok(id) = token.trim_start_matches('#').parse::<u32>() {
        if let Some((found, _)) = candidates.clone().find(|(cid, _)| *cid == id) {
            return Some((found, MatchReason::Id));
        }
    }

    let token_lower = token.to_lowercase();

    if let Some((found, _)) = candidates
        .clone()
        .find(|(_, name)| name.to_lowercase() == token_lower)
    {
        return Some((found, MatchReason::ExactName));
    }

    candidates
        .clone()
        .find(|(_, name)| {
            let name_lower = name.to_lowercase();
            name_lower.starts_with(&token_lower)
                || name_lower
                    .split_whitespace()
                    .any(|word| word.starts_with(&token_lower))
        })
        .map(|(found, _)| (found, MatchReason::PartialName))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTS: [(u32, &str); 3] = [(1, "left upper arm"), (2, "left hand"), (12, "head")];

    #[test]
    fn test_id_beats_name() {
        assert_eq!(find_by_token(PARTS, "12"), Some((12, MatchReason::Id)));
        assert_eq!(find_by_token(PARTS, "#2"), Some((2, MatchReason::Id)));
    }

    #[test]
    fn test_exact_beats_prefix() {
        let parts = [(1, "hand guard"), (2, "hand")];
        assert_eq!(find_by_token(parts, "hand"), Some((2, MatchReason::ExactName)));
    }

    #[test]
    fn test_prefix_and_word_prefix() {
        assert_eq!(find_by_token(PARTS, "le"), Some((1, MatchReason::PartialName)));
        assert_eq!(find_by_token(PARTS, "HAN"), Some((2, MatchReason::PartialName)));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(find_by_token(PARTS, "tail"), None);
        assert_eq!(find_by_token(PARTS, "  "), None);
        assert_eq!(find_by_token(PARTS, "99"), None);
    }
}
