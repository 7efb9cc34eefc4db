//! Filename sanitizer.
//!
//! Strips the byte sequences that let a caller-supplied name escape its
//! base directory, truncate a path at a NUL, or smuggle extra lines into a
//! response header. A scrubbed name...
//!
//! - contains no `/` or `\`, so it can only ever name a single path
//!   segment (subdirectory references are removed along with traversal);
//! - contains no CR or LF, so it is safe to place in a header value;
//! - contains no NUL;
//! - scrubs to itself: `scrub(scrub(s)) == scrub(s)`.
//!
//! Substitution is table-driven and ordered: multi-byte sequences are
//! removed before their constituent bytes, and each pattern gets one full
//! pass over the accumulated result of the passes before it. The trailing
//! single-byte entries guarantee the output invariants no matter what the
//! earlier passes left behind.

/// Substitution table, applied top to bottom.
const TABLE: [(&str, &str); 10] = [
    // Traversal sequences, both separator flavors.
    ("../", ""),
    ("..\\", ""),
    ("./", ""),
    (".\\", ""),
    // Bare separators.
    ("/", ""),
    ("\\", ""),
    // Header line breaks.
    ("\r\n", ""),
    ("\r", ""),
    ("\n", ""),
    // NUL.
    ("\0", ""),
];

/// Scrubs `input`. Always succeeds; the result may be empty.
pub fn scrub(input: &str) -> String {
    TABLE
        .iter()
        .fold(input.to_string(), |acc, (pattern, replacement)| {
            acc.replace(pattern, replacement)
        })
}
