use crate::error::ConvertError;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const SNIFF_SAMPLE_CHARS: usize = 8192;
const CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEncoding {
    Utf8,
    Latin1,
}

impl FromStr for InputEncoding {
    type Err = ConvertError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" | "utf-8-sig" | "utf8-sig" => Ok(InputEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(InputEncoding::Latin1),
            other => Err(ConvertError::Encoding(format!("unsupported encoding: {other}"))),
        }
    }
}

impl InputEncoding {
    pub fn decode(self, bytes: &[u8]) -> Result<String, ConvertError> {
        let text = match self {
            InputEncoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|err| ConvertError::Encoding(format!("input is not valid utf-8: {err}")))?,
            InputEncoding::Latin1 => bytes.iter().map(|byte| char::from(*byte)).collect(),
        };
        match text.strip_prefix('\u{feff}') {
            Some(stripped) => Ok(stripped.to_string()),
            None => Ok(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterHint {
    Auto,
    Fixed(u8),
}

impl FromStr for DelimiterHint {
    type Err = ConvertError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "\t" {
            return Ok(DelimiterHint::Fixed(b'\t'));
        }
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(DelimiterHint::Auto),
            "comma" => Ok(DelimiterHint::Fixed(b',')),
            "semicolon" => Ok(DelimiterHint::Fixed(b';')),
            "tab" | "\\t" => Ok(DelimiterHint::Fixed(b'\t')),
            "pipe" => Ok(DelimiterHint::Fixed(b'|')),
            _ if value.len() == 1 && value.is_ascii() => Ok(DelimiterHint::Fixed(value.as_bytes()[0])),
            other => Err(ConvertError::Config(format!("unknown delimiter: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub delimiter: u8,
}

impl Table {
    pub fn parse(bytes: &[u8], encoding: &str, delimiter: &str) -> Result<Self, ConvertError> {
        let encoding = InputEncoding::from_str(encoding)?;
        let hint = DelimiterHint::from_str(delimiter)?;
        let text = encoding.decode(bytes)?;
        Table::from_text(&text, hint)
    }

    pub fn from_text(text: &str, hint: DelimiterHint) -> Result<Self, ConvertError> {
        let delimiter = match hint {
            DelimiterHint::Fixed(delimiter) => delimiter,
            DelimiterHint::Auto => {
                let (sample, truncated) = sample_prefix(text, SNIFF_SAMPLE_CHARS);
                sniff_sample(sample, truncated)
            }
        };
        tracing::debug!(delimiter = %char::from(delimiter).escape_default(), "csv delimiter");

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = reader.records();
        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => return Err(ConvertError::EmptyInput),
        };
        let mut rows = Vec::new();
        for record in records {
            let mut row: Vec<String> = record?.iter().map(str::to_string).collect();
            if row.len() < headers.len() {
                row.resize(headers.len(), String::new());
            }
            rows.push(row);
        }
        tracing::debug!(headers = ?headers, rows = rows.len(), "csv table read");
        Ok(Table {
            headers,
            rows,
            delimiter,
        })
    }
}

pub fn read_table(path: &Path, encoding: &str, delimiter: &str) -> Result<Table, ConvertError> {
    let bytes = fs::read(path)?;
    Table::parse(&bytes, encoding, delimiter)
}

pub fn sniff_delimiter(sample: &str) -> u8 {
    sniff_sample(sample, false)
}

fn sample_prefix(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => (&text[..offset], true),
        None => (text, false),
    }
}

fn sniff_sample(sample: &str, truncated: bool) -> u8 {
    let lines = count_per_line(sample, truncated);
    if let Some(delimiter) = most_consistent(&lines) {
        return delimiter;
    }
    let mut best: Option<(usize, u8)> = None;
    for (pos, candidate) in CANDIDATES.iter().enumerate() {
        let total: usize = lines.iter().map(|counts| counts[pos]).sum();
        if total > 0 && best.map_or(true, |(count, _)| total > count) {
            best = Some((total, *candidate));
        }
    }
    best.map_or(b',', |(_, delimiter)| delimiter)
}

// Delimiter counts per logical line, ignoring anything inside double quotes.
fn count_per_line(sample: &str, truncated: bool) -> Vec<[usize; 4]> {
    let mut lines = Vec::new();
    let mut counts = [0usize; 4];
    let mut in_quotes = false;
    let mut has_content = false;
    for byte in sample.bytes() {
        match byte {
            b'"' => {
                in_quotes = !in_quotes;
                has_content = true;
            }
            b'\n' if !in_quotes => {
                if has_content {
                    lines.push(counts);
                }
                counts = [0; 4];
                has_content = false;
            }
            b'\r' if !in_quotes => {}
            other => {
                has_content = true;
                if !in_quotes {
                    if let Some(pos) = CANDIDATES.iter().position(|candidate| *candidate == other) {
                        counts[pos] += 1;
                    }
                }
            }
        }
    }
    if has_content && (!truncated || lines.is_empty()) {
        lines.push(counts);
    }
    lines
}

fn most_consistent(lines: &[[usize; 4]]) -> Option<u8> {
    if lines.is_empty() {
        return None;
    }
    let mut best: Option<(f64, usize, u8)> = None;
    for (pos, candidate) in CANDIDATES.iter().enumerate() {
        let (mode, frequency) = modal_count(lines.iter().map(|counts| counts[pos]));
        if mode == 0 {
            continue;
        }
        let consistency = frequency as f64 / lines.len() as f64;
        let better = match best {
            None => true,
            Some((best_consistency, best_mode, _)) => {
                consistency > best_consistency
                    || (consistency == best_consistency && mode > best_mode)
            }
        };
        if better {
            best = Some((consistency, mode, *candidate));
        }
    }
    best.map(|(_, _, delimiter)| delimiter)
}

fn modal_count(counts: impl Iterator<Item = usize>) -> (usize, usize) {
    let mut tally: Vec<(usize, usize)> = Vec::new();
    for count in counts {
        match tally.iter_mut().find(|(value, _)| *value == count) {
            Some((_, frequency)) => *frequency += 1,
            None => tally.push((count, 1)),
        }
    }
    tally
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .unwrap_or((0, 0))
}
