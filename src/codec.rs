use std::path::PathBuf;

const DECIMAL_NAME_LIMIT: u64 = 99_999_999;

/// Base-`folder_size` digits of `id` at positions `depth..=1`, outermost
/// first. Wider ids wrap.
pub fn encode(id: u64, depth: u32, folder_size: u64) -> Vec<u64> {
    (1..=depth)
        .rev()
        .map(|level| match folder_size.checked_pow(level) {
            Some(divisor) => (id / divisor) % folder_size,
            // Larger than any u64 id, so the quotient is zero.
            None => 0,
        })
        .collect()
}

pub fn bucket_path(id: u64, depth: u32, folder_size: u64) -> PathBuf {
    encode(id, depth, folder_size)
        .into_iter()
        .map(|segment| segment.to_string())
        .collect()
}

pub fn source_file_name(id: u64) -> String {
    if id > DECIMAL_NAME_LIMIT {
        format!("A{id:X}")
    } else {
        id.to_string()
    }
}
