/// Character classes (CJK ranges, control mapping, density)
pub mod charclass;

/// Line filtering and allow-list normalization
pub mod cleaner;

/// Candidate decodings of raw byte buffers
pub mod decoder;

/// Candidate ranking
pub mod scorer;

pub use cleaner::{CleanOptions, TextCleaner};
pub use decoder::{DecodeCandidate, decode_candidates};
pub use scorer::select_best;
