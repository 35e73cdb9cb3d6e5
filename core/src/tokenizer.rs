use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SPLIT_RE: Regex = Regex::new(r"[\s-]+").expect("valid regex");
    // Marks, separators, symbols, punctuation and "other" at either end of a token.
    // Everything but letters and numbers.
    static ref EDGE_RE: Regex = Regex::new(
        r"^[\p{M}\p{Z}\p{S}\p{P}\p{C}]+|[\p{M}\p{Z}\p{S}\p{P}\p{C}]+$"
    )
    .expect("valid regex");
}

/// Split text on whitespace and hyphens.
///
/// The sequence is lazy and a fresh one is produced on every call. Empty input
/// yields a single empty token, which [`normalize`] keeps empty.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> + '_ {
    SPLIT_RE.split(text.trim())
}

/// Lower-case a token and strip non letter/number runs from both of its ends.
///
/// Interior punctuation survives, so `don't` stays `don't`.
pub fn normalize(token: &str) -> String {
    let lower = token.to_lowercase();
    EDGE_RE.replace_all(&lower, "").into_owned()
}

/// Tokenize and normalize, dropping tokens that normalize to nothing.
pub fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    tokenize(text).map(normalize).filter(|term| !term.is_empty())
}
