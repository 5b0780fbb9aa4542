//! Pick the most plausible decoding.

use super::decoder::DecodeCandidate;

/// Choose the winning candidate.
///
/// Any candidate holding a CJK ideograph beats every candidate without one.
/// Within the same class the longer text wins; ties keep the earlier
/// candidate. Returns `None` for an empty input.
pub fn select_best<I>(candidates: I) -> Option<DecodeCandidate>
where
    I: IntoIterator<Item = DecodeCandidate>,
{
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(best) if rank(&best) >= rank(&candidate) => Some(best),
        _ => Some(candidate),
    })
}

#[inline]
fn rank(candidate: &DecodeCandidate) -> (bool, usize) {
    (candidate.has_cjk(), candidate.char_count)
}
