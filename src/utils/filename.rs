use std::path::Path;

const PART_PREFIX: &str = "part-";
const PART_SUFFIX: &str = ".parquet";
const TEMP_SUFFIX: &str = ".tmp";

/// Name of the `seq`-th committed part of a table: `part-000042.parquet`.
pub fn part_file_name(seq: u64) -> String {
    format!("{}{:06}{}", PART_PREFIX, seq, PART_SUFFIX)
}

/// Name a part is written under before it is made durable.
pub fn temp_part_file_name(seq: u64) -> String {
    format!("{}{}", part_file_name(seq), TEMP_SUFFIX)
}

/// Sequence number of a committed part, `None` for anything else
/// (including parts still being written).
pub fn parse_part_sequence(path: &Path) -> Option<u64> {
    path.file_name()?
        .to_str()?
        .strip_prefix(PART_PREFIX)?
        .strip_suffix(PART_SUFFIX)?
        .parse()
        .ok()
}
