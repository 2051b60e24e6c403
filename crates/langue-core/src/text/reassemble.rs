/// Appended after every translated chunk, including the last one.
pub const CHUNK_SEPARATOR: char = '\n';

/// Join translated chunks in the order given.
///
/// Every chunk is followed by one [`CHUNK_SEPARATOR`], so `n` chunks give
/// exactly `n` separators. Chunks are neither trimmed nor deduplicated.
pub fn reassemble<S: AsRef<str>>(translated: &[S]) -> String {
    let capacity = translated.iter().map(|c| c.as_ref().len() + 1).sum();
    translated
        .iter()
        .fold(String::with_capacity(capacity), |mut out, chunk| {
            out.push_str(chunk.as_ref());
            out.push(CHUNK_SEPARATOR);
            out
        })
}
