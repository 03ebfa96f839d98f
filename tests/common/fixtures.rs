//! Line-file corpora used across harnesses.
//!
//! Documents follow the `title<TAB>date<TAB>body` layout read by the `line`
//! content source.

use std::io::Write;
use tempfile::NamedTempFile;

/// Header line accepted (and skipped) by the line source.
pub const LINE_HEADER: &str = "FIELDS_HEADER_INDICATOR###\ttitle\tdate\tbody";

/// `n` documents in line-file form, preceded by a header.
pub fn line_text(n: usize) -> String {
    let mut text = String::from(LINE_HEADER);
    text.push('\n');
    for i in 0..n {
        text.push_str(&format!(
            "doc {i}\t2024-01-{day:02}\tbody of document {i} with a few words\n",
            day = i % 28 + 1
        ));
    }
    text
}

/// [`line_text`] written to a temp file. Keep the handle alive for as long as
/// the path is used.
pub fn line_file(n: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp line file");
    file.write_all(line_text(n).as_bytes())
        .expect("write temp line file");
    file.flush().expect("flush temp line file");
    file
}

/// A TOML config written to a temp file.
pub fn config_file(toml: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(toml.as_bytes()).expect("write temp config");
    file.flush().expect("flush temp config");
    file
}
