//! Splits candidate columns into per-unit chunks.

/// Partition `items` into exactly `parts` contiguous, disjoint chunks.
///
/// Chunk sizes differ by at most one; the first `len % parts` chunks carry
/// the extra item. When there are fewer items than parts, trailing chunks
/// are empty. A `parts` of zero is treated as one.
#[must_use]
pub fn chunkify<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    let parts = parts.max(1);
    let base = items.len() / parts;
    let extra = items.len() % parts;

    let mut chunks = Vec::with_capacity(parts);
    let mut items = items.into_iter();
    for index in 0..parts {
        let size = base + usize::from(index < extra);
        chunks.push(items.by_ref().take(size).collect());
    }

    chunks
}
