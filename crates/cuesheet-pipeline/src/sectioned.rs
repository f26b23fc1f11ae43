use crate::config::ConvertOptions;
use crate::document::{serialize_pairs, SubtitleItem, SAMPLE_SUBTITLES, SAMPLE_TOP_CLAIMS, SAMPLE_TOP_DISCLAIMERS};
use crate::error::ConvertError;
use crate::simple::{normalize, resolve_column, END_CANDIDATES, START_CANDIDATES};
use crate::table::Table;
use crate::value::MetaValue;
use cuesheet_timing::parse_timecode;
use serde::Serialize;
use std::collections::BTreeMap;

/// Values in the first header cell that mark a sectioned export.
pub const SECTION_HEADERS: [&str; 4] = ["subtitles", "claim", "disclaimer", "metadata"];

const COUNTRY_KEY: &str = "country";
const DEFAULT_COUNTRY: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Subtitles,
    Claim,
    Disclaimer,
    Disclaimer02,
    Metadata,
    Unknown,
}

impl Section {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "subtitles" => Section::Subtitles,
            "claim" => Section::Claim,
            "disclaimer" => Section::Disclaimer,
            "disclaimer_02" => Section::Disclaimer02,
            "metadata" => Section::Metadata,
            _ => Section::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionedPayload {
    pub subtitles: Vec<SubtitleItem>,
    pub claim: Vec<SubtitleItem>,
    pub disclaimer: Vec<SubtitleItem>,
    pub disclaimer_02: Vec<SubtitleItem>,
    pub metadata: BTreeMap<String, MetaValue>,
}

impl SectionedPayload {
    fn section_mut(&mut self, section: Section) -> Option<&mut Vec<SubtitleItem>> {
        match section {
            Section::Subtitles => Some(&mut self.subtitles),
            Section::Claim => Some(&mut self.claim),
            Section::Disclaimer => Some(&mut self.disclaimer),
            Section::Disclaimer02 => Some(&mut self.disclaimer_02),
            Section::Metadata | Section::Unknown => None,
        }
    }

    pub fn sample(&self) -> SectionedPayload {
        let mut sampled = self.clone();
        sampled.subtitles.truncate(SAMPLE_SUBTITLES);
        sampled.claim.truncate(SAMPLE_TOP_CLAIMS);
        sampled.disclaimer.truncate(SAMPLE_TOP_DISCLAIMERS);
        sampled.disclaimer_02.truncate(SAMPLE_TOP_DISCLAIMERS);
        sampled
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionedMultiDocument {
    #[serde(rename = "_multi")]
    pub multi: bool,
    pub countries: Vec<String>,
    #[serde(rename = "byCountry", serialize_with = "serialize_pairs")]
    pub by_country: Vec<(String, SectionedPayload)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionedColumns {
    pub line: Option<usize>,
    pub start: Option<usize>,
    pub end: Option<usize>,
    /// One text column per country, left to right.
    pub texts: Vec<usize>,
}

impl SectionedColumns {
    pub fn detect(headers: &[String], options: &ConvertOptions) -> Result<Self, ConvertError> {
        let mut texts = text_columns(headers);
        if texts.is_empty() {
            let position = options
                .text_col
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit()))
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|position| *position >= 1);
            texts.push(match position {
                Some(position) => position - 1,
                None => headers.len().saturating_sub(1),
            });
        }
        Ok(SectionedColumns {
            line: headers.iter().position(|header| normalize(header) == "line"),
            start: resolve_column(headers, options.start_col.as_deref(), &START_CANDIDATES)?,
            end: resolve_column(headers, options.end_col.as_deref(), &END_CANDIDATES)?,
            texts,
        })
    }

    /// Metadata keys sit in the column just left of the first text column.
    fn key_column(&self) -> usize {
        self.texts.iter().min().map_or(0, |first| first.saturating_sub(1))
    }
}

fn text_columns(headers: &[String]) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, header)| normalize(header) == "text")
        .map(|(idx, _)| idx)
        .collect()
}

/// Whether a table without `record_type` still reads as a plain start/end/text list.
///
/// Several `text` columns, a section name in the first header, or no start column
/// switch to the sectioned layout.
pub fn is_simple_layout(headers: &[String], options: &ConvertOptions) -> bool {
    let has_start = resolve_column(headers, options.start_col.as_deref(), &START_CANDIDATES)
        .map_or(true, |column| column.is_some());
    let first = headers
        .first()
        .map(|header| header.trim().to_lowercase())
        .unwrap_or_default();
    has_start && text_columns(headers).len() <= 1 && !SECTION_HEADERS.contains(&first.as_str())
}

struct CountryBuckets {
    codes: Vec<String>,
    payloads: Vec<SectionedPayload>,
}

impl CountryBuckets {
    fn bucket(&mut self, position: usize) -> &mut SectionedPayload {
        while self.codes.len() <= position {
            self.codes.push(format!("col{}", self.codes.len() + 1));
            self.payloads.push(SectionedPayload::default());
        }
        &mut self.payloads[position]
    }

    fn rename(&mut self, position: usize, code: &str) {
        self.bucket(position);
        self.codes[position] = code.to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SectionedOutput {
    Single(SectionedPayload),
    Multi(SectionedMultiDocument),
}

/// Converts an export where the first column names the section and each text column is a country.
///
/// Rows in `subtitles`, `claim`, `disclaimer` and `disclaimer_02` need parseable start and
/// end times; rows without them are skipped. `metadata` rows hold a key and one value per
/// country, and a `country` key names the country columns.
pub fn convert_sectioned(table: &Table, options: &ConvertOptions) -> Result<SectionedOutput, ConvertError> {
    let columns = SectionedColumns::detect(&table.headers, options)?;
    let format = options.time_format();
    let key_column = columns.key_column();
    let mut buckets = CountryBuckets {
        codes: Vec::new(),
        payloads: Vec::new(),
    };
    let mut section = table
        .headers
        .first()
        .map(|header| Section::parse(if header.trim().is_empty() { "subtitles" } else { header.as_str() }))
        .unwrap_or(Section::Subtitles);
    let mut auto_line = options.start_line_index;

    for row in &table.rows {
        let cell = |column: usize| row.get(column).map(String::as_str).unwrap_or("");
        let marker = cell(0).trim();
        if !marker.is_empty() {
            section = Section::parse(marker);
        }

        match section {
            Section::Metadata => {
                let key = cell(key_column).trim();
                if key.is_empty() {
                    continue;
                }
                let is_country = key.eq_ignore_ascii_case(COUNTRY_KEY);
                for (position, column) in columns.texts.iter().enumerate() {
                    let value = cell(*column).trim();
                    if is_country {
                        if value.is_empty() {
                            buckets.bucket(position);
                        } else {
                            buckets.rename(position, value);
                        }
                    } else {
                        buckets
                            .bucket(position)
                            .metadata
                            .insert(key.to_string(), MetaValue::text(value));
                    }
                }
            }
            Section::Unknown => {}
            timed => {
                let line = columns
                    .line
                    .map(cell)
                    .and_then(|value| value.trim().parse::<i64>().ok())
                    .unwrap_or(auto_line);
                let time = |column: Option<usize>| parse_timecode(column.map(cell).unwrap_or(""), options.fps);
                let (Ok(start), Ok(end)) = (time(columns.start), time(columns.end)) else {
                    tracing::debug!(line, "skipping sectioned row without timing");
                    continue;
                };
                for (position, column) in columns.texts.iter().enumerate() {
                    let raw = cell(*column);
                    let text = if options.strip_text { raw.trim() } else { raw };
                    if options.skip_empty_text && text.trim().is_empty() {
                        continue;
                    }
                    if let Some(items) = buckets.bucket(position).section_mut(timed) {
                        items.push(SubtitleItem {
                            line,
                            in_time: format.format(start),
                            out: format.format(end),
                            text: text.to_string(),
                        });
                    }
                }
                auto_line += 1;
            }
        }
    }

    let CountryBuckets { mut codes, mut payloads } = buckets;
    if codes.is_empty() {
        codes.push(DEFAULT_COUNTRY.to_string());
        payloads.push(SectionedPayload::default());
    }
    if codes.len() == 1 {
        return Ok(SectionedOutput::Single(payloads.remove(0)));
    }

    // A code named by several columns keeps the rightmost column's data.
    let mut by_country: Vec<(String, SectionedPayload)> = Vec::with_capacity(codes.len());
    for (code, payload) in codes.iter().zip(payloads) {
        match by_country.iter_mut().find(|(existing, _)| existing == code) {
            Some(slot) => slot.1 = payload,
            None => by_country.push((code.clone(), payload)),
        }
    }
    tracing::debug!(countries = ?codes, "sectioned countries");
    Ok(SectionedOutput::Multi(SectionedMultiDocument {
        multi: true,
        countries: codes,
        by_country,
    }))
}
