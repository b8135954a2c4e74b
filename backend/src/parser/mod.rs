//! CSV lexing and byte decoding.
//!
//! The lexer works one line at a time and never fails: quoted fields may
//! contain commas, `""` inside quotes is a literal quote, and an unterminated
//! quote simply runs to the end of the line. Every cell is trimmed.
//!
//! Column lookup by header name lives in [`columns`].

pub mod columns;

pub use columns::ColumnResolver;

/// Split one CSV line into trimmed cells.
///
/// # Example
/// ```ignore
/// use memberreg::parser::split_line;
///
/// let cells = split_line(r#"MEM001,"Doe, John",9876543210"#);
/// assert_eq!(cells, vec!["MEM001", "Doe, John", "9876543210"]);
/// ```
pub fn split_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());

    cells
}

/// Non-blank lines with their 1-based physical line numbers.
///
/// Lines end at `\n` with an optional preceding `\r`; whitespace-only lines
/// are skipped.
pub fn content_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line))
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode uploaded bytes to text.
///
/// Valid UTF-8 is used as is (minus a BOM). Anything else goes through
/// encoding detection and falls back to Windows-1252, which maps every byte.
pub fn decode_content(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let encoding = match detect_encoding(bytes).as_str() {
        "iso-8859-1" => encoding_rs::ISO_8859_15,
        "windows-1252" => encoding_rs::WINDOWS_1252,
        other => encoding_rs::Encoding::for_label(other.as_bytes())
            .filter(|encoding| *encoding != encoding_rs::UTF_8)
            .unwrap_or(encoding_rs::WINDOWS_1252),
    };
    encoding.decode(bytes).0.into_owned()
}
