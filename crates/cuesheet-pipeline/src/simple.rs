use crate::config::ConvertOptions;
use crate::document::{SimpleDocument, SubtitleItem};
use crate::error::ConvertError;
use crate::table::Table;
use cuesheet_timing::parse_timecode;

pub const START_CANDIDATES: [&str; 4] = ["starttime", "start", "in", "inpoint"];
pub const END_CANDIDATES: [&str; 4] = ["endtime", "end", "out", "outpoint"];
pub const TEXT_CANDIDATES: [&str; 4] = ["text", "subtitle", "caption", "line"];

pub(crate) fn normalize(header: &str) -> String {
    header
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_ascii_lowercase())
        .collect()
}

/// Finds a column by 1-based index or header name when overridden, else by candidate names.
pub fn resolve_column(
    headers: &[String],
    column_override: Option<&str>,
    candidates: &[&str],
) -> Result<Option<usize>, ConvertError> {
    let normalized: Vec<String> = headers.iter().map(|header| normalize(header)).collect();
    if let Some(wanted) = column_override.map(str::trim).filter(|value| !value.is_empty()) {
        if wanted.bytes().all(|byte| byte.is_ascii_digit()) {
            let position = wanted
                .parse::<usize>()
                .ok()
                .filter(|position| (1..=headers.len()).contains(position))
                .ok_or_else(|| {
                    ConvertError::ColumnOverride(format!(
                        "column index {wanted} out of range 1..{}",
                        headers.len()
                    ))
                })?;
            return Ok(Some(position - 1));
        }
        if let Some(idx) = headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(wanted))
        {
            return Ok(Some(idx));
        }
        let key = normalize(wanted);
        return normalized
            .iter()
            .position(|header| *header == key)
            .map(Some)
            .ok_or_else(|| {
                ConvertError::ColumnOverride(format!(
                    "override column '{wanted}' not found in headers {headers:?}"
                ))
            });
    }
    Ok(candidates
        .iter()
        .find_map(|candidate| normalized.iter().position(|header| header.as_str() == *candidate)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleColumns {
    pub start: usize,
    pub end: usize,
    pub text: usize,
}

impl SimpleColumns {
    pub fn detect(headers: &[String], options: &ConvertOptions) -> Result<Self, ConvertError> {
        let start = resolve_column(headers, options.start_col.as_deref(), &START_CANDIDATES)?;
        let end = resolve_column(headers, options.end_col.as_deref(), &END_CANDIDATES)?;
        let text = resolve_column(headers, options.text_col.as_deref(), &TEXT_CANDIDATES)?;
        match (start, end, text) {
            (Some(start), Some(end), Some(text)) => Ok(SimpleColumns { start, end, text }),
            _ => {
                let missing: Vec<&str> = [("start", start), ("end", end), ("text", text)]
                    .into_iter()
                    .filter(|(_, column)| column.is_none())
                    .map(|(name, _)| name)
                    .collect();
                Err(ConvertError::MissingColumns {
                    missing: missing.join(", "),
                    headers: headers.to_vec(),
                })
            }
        }
    }
}

pub fn convert_simple(table: &Table, options: &ConvertOptions) -> Result<SimpleDocument, ConvertError> {
    let columns = SimpleColumns::detect(&table.headers, options)?;
    let format = options.time_format();
    let mut subtitles = Vec::with_capacity(table.rows.len());
    let mut line = options.start_line_index;
    for (idx, row) in table.rows.iter().enumerate() {
        let cell = |column: usize| row.get(column).map(String::as_str).unwrap_or("");
        let raw_text = cell(columns.text);
        let text = if options.strip_text {
            raw_text.trim()
        } else {
            raw_text
        };
        if options.skip_empty_text && text.trim().is_empty() {
            continue;
        }
        let timecode = |column: usize| {
            let value = cell(column).trim();
            parse_timecode(value, options.fps).map_err(|source| ConvertError::Timecode {
                row: idx + 1,
                column: table.headers[column].clone(),
                value: value.to_string(),
                source,
            })
        };
        subtitles.push(SubtitleItem {
            line,
            in_time: format.format(timecode(columns.start)?),
            out: format.format(timecode(columns.end)?),
            text: text.to_string(),
        });
        line += 1;
    }
    Ok(SimpleDocument { subtitles })
}
