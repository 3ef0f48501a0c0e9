//! Multi-strategy fuzzy matching for path completion
//!
//! Matching is case-insensitive; original-case agreement earns a scoring
//! bonus. Strategies are tried in priority order: a prefix match wins
//! outright, otherwise word-boundary, consecutive-run and subsequence
//! matching are all attempted and the best-scoring result is kept.

/// Strategy that produced a match, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Text starts with the pattern
    Prefix,

    /// Every pattern character lands on a word start or extends a run
    WordBoundary,

    /// Pattern matches one contiguous run of text
    Consecutive,

    /// Pattern characters appear in order, gaps allowed
    Subsequence,
}

impl MatchStrategy {
    fn multiplier(self) -> f64 {
        match self {
            MatchStrategy::Prefix => 2.0,
            MatchStrategy::WordBoundary => 1.8,
            MatchStrategy::Consecutive => 1.3,
            MatchStrategy::Subsequence => 1.0,
        }
    }
}

/// Outcome of matching one pattern against one candidate string.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    /// Quality score, always >= 0 (higher is better)
    pub score: f64,

    /// Matched character positions in the text, ascending
    pub indices: Vec<usize>,

    /// Strategy that produced this match
    pub strategy: MatchStrategy,
}

/// Match `pattern` against `text`.
///
/// An empty pattern matches everything with score 0 and no indices; callers
/// use that for "list everything" queries. Returns `None` when the pattern
/// cannot be matched by any strategy.
pub fn fuzzy_match(pattern: &str, text: &str) -> Option<FuzzyMatch> {
    if pattern.is_empty() {
        return Some(FuzzyMatch {
            score: 0.0,
            indices: Vec::new(),
            strategy: MatchStrategy::Prefix,
        });
    }

    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();
    let pattern_lower = lowercase(&pattern_chars);
    let text_lower = lowercase(&text_chars);

    if text_lower.starts_with(&pattern_lower) {
        let indices: Vec<usize> = (0..pattern_chars.len()).collect();
        let score = score_indices(&indices, &pattern_chars, &text_chars)
            * MatchStrategy::Prefix.multiplier();
        return Some(FuzzyMatch {
            score,
            indices,
            strategy: MatchStrategy::Prefix,
        });
    }

    let candidates = [
        (
            MatchStrategy::WordBoundary,
            word_boundary_indices(&pattern_lower, &text_lower, &text_chars),
        ),
        (
            MatchStrategy::Consecutive,
            consecutive_indices(&pattern_lower, &text_lower),
        ),
        (
            MatchStrategy::Subsequence,
            subsequence_indices(&pattern_lower, &text_lower),
        ),
    ];

    let mut best: Option<FuzzyMatch> = None;
    for (strategy, indices) in candidates {
        let Some(indices) = indices else { continue };
        let score = score_indices(&indices, &pattern_chars, &text_chars) * strategy.multiplier();
        let improves = best.as_ref().map_or(true, |b| score > b.score);
        if improves {
            best = Some(FuzzyMatch {
                score,
                indices,
                strategy,
            });
        }
    }
    best
}

fn lowercase(chars: &[char]) -> Vec<char> {
    // Per-char lowering keeps index alignment with the original string
    chars
        .iter()
        .map(|c| c.to_lowercase().next().unwrap_or(*c))
        .collect()
}

/// Position starts the string or follows a separator.
fn at_separator_boundary(text: &[char], idx: usize) -> bool {
    idx == 0 || matches!(text[idx - 1], '/' | '-' | '_' | '.')
}

/// Lowercase-to-uppercase transition in the original text.
fn at_camel_boundary(text: &[char], idx: usize) -> bool {
    idx > 0 && text[idx - 1].is_lowercase() && text[idx].is_uppercase()
}

fn is_word_start(text: &[char], idx: usize) -> bool {
    at_separator_boundary(text, idx) || at_camel_boundary(text, idx)
}

/// Greedy word-boundary matching: a pattern character is consumed only at a
/// word start or directly after the previously consumed position.
fn word_boundary_indices(
    pattern: &[char],
    text_lower: &[char],
    text: &[char],
) -> Option<Vec<usize>> {
    let mut indices = Vec::with_capacity(pattern.len());
    let mut consumed = 0;
    for (idx, &ch) in text_lower.iter().enumerate() {
        if consumed == pattern.len() {
            break;
        }
        if ch != pattern[consumed] {
            continue;
        }
        let continues_run = indices.last() == Some(&(idx.wrapping_sub(1)));
        if is_word_start(text, idx) || continues_run {
            indices.push(idx);
            consumed += 1;
        }
    }
    (consumed == pattern.len()).then_some(indices)
}

/// Contiguous-run matching: a mismatch resets progress to the start of the
/// pattern.
fn consecutive_indices(pattern: &[char], text_lower: &[char]) -> Option<Vec<usize>> {
    let mut run: Vec<usize> = Vec::with_capacity(pattern.len());
    for (idx, &ch) in text_lower.iter().enumerate() {
        if ch == pattern[run.len()] {
            run.push(idx);
        } else {
            run.clear();
            if ch == pattern[0] {
                run.push(idx);
            }
        }
        if run.len() == pattern.len() {
            return Some(run);
        }
    }
    None
}

/// In-order matching with gaps allowed.
fn subsequence_indices(pattern: &[char], text_lower: &[char]) -> Option<Vec<usize>> {
    let mut indices = Vec::with_capacity(pattern.len());
    let mut consumed = 0;
    for (idx, &ch) in text_lower.iter().enumerate() {
        if consumed == pattern.len() {
            break;
        }
        if ch == pattern[consumed] {
            indices.push(idx);
            consumed += 1;
        }
    }
    (consumed == pattern.len()).then_some(indices)
}

/// Score a matched index sequence against the original-case strings.
///
/// Base 100; first-index bonus or distance penalty; +10 per consecutive
/// adjacent pair; boundary and camel bonuses per index; original-case
/// agreement bonus; gap penalty between non-adjacent pairs; floored at 0.
/// The strategy multiplier is applied by the caller.
fn score_indices(indices: &[usize], pattern: &[char], text: &[char]) -> f64 {
    let mut score = 100.0;

    let first = indices[0];
    if first == 0 {
        score += 50.0;
    } else {
        score -= 2.0 * first as f64;
    }

    for pair in indices.windows(2) {
        if pair[1] == pair[0] + 1 {
            score += 10.0;
        } else {
            score -= 1.5 * (pair[1] - pair[0] - 1) as f64;
        }
    }

    for (pattern_idx, &text_idx) in indices.iter().enumerate() {
        if at_separator_boundary(text, text_idx) {
            score += 5.0;
        } else if at_camel_boundary(text, text_idx) {
            score += 3.0;
        }
        if pattern[pattern_idx] == text[text_idx] {
            score += 2.0;
        }
    }

    // Coverage bonus: the same match shape ranks higher in a shorter text
    score += 10.0 * pattern.len() as f64 / text.len() as f64;

    score.max(0.0)
}
