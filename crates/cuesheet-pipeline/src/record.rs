use crate::columns::{ColumnLayout, Orientation};
use crate::error::ConvertError;
use cuesheet_timing::parse_timecode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordType {
    Subtitle,
    Claim,
    Disclaimer,
    Disclaimer02,
    Logo,
    EndFrame,
    SuperA,
    SuperB,
    MetaGlobal,
    MetaLocal,
}

/// How a bucket's line counter reacts to rows with and without explicit line numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Numbering {
    /// Missing lines take the counter and advance it; explicit lines leave it alone.
    Sequential,
    /// Missing lines reuse the counter; explicit lines move it.
    Sticky,
    /// Missing lines take the counter and advance it; explicit lines move it past themselves.
    Following,
}

impl RecordType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sub" => Some(RecordType::Subtitle),
            "claim" => Some(RecordType::Claim),
            "disclaimer" => Some(RecordType::Disclaimer),
            "disclaimer_02" => Some(RecordType::Disclaimer02),
            "logo" => Some(RecordType::Logo),
            "endframe" | "end_frame" => Some(RecordType::EndFrame),
            "super_a" => Some(RecordType::SuperA),
            "super_b" => Some(RecordType::SuperB),
            "meta_global" | "meta-global" => Some(RecordType::MetaGlobal),
            "meta_local" | "meta-local" => Some(RecordType::MetaLocal),
            _ => None,
        }
    }

    pub fn is_meta(self) -> bool {
        matches!(self, RecordType::MetaGlobal | RecordType::MetaLocal)
    }

    pub fn numbering(self) -> Numbering {
        match self {
            RecordType::Claim => Numbering::Sequential,
            RecordType::Subtitle | RecordType::SuperA | RecordType::SuperB => Numbering::Following,
            _ => Numbering::Sticky,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordType::Subtitle => "subtitles",
            RecordType::Claim => "claim",
            RecordType::Disclaimer => "disclaimer",
            RecordType::Disclaimer02 => "disclaimer_02",
            RecordType::Logo => "logo",
            RecordType::EndFrame => "endFrame",
            RecordType::SuperA => "super_A",
            RecordType::SuperB => "super_B",
            RecordType::MetaGlobal => "meta_global",
            RecordType::MetaLocal => "meta_local",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timing {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl Timing {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_timed(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn is_untimed(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Exact key for fully timed entries.
    pub fn timed_key(&self) -> Option<(u64, u64)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start.to_bits(), end.to_bits())),
            _ => None,
        }
    }

    pub fn bits(&self) -> (Option<u64>, Option<u64>) {
        (self.start.map(f64::to_bits), self.end.map(f64::to_bits))
    }
}

/// Per-country texts for both orientations, indexed by country position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrientedText {
    pub landscape: Vec<String>,
    pub portrait: Vec<String>,
}

impl OrientedText {
    pub fn new(countries: usize) -> Self {
        Self {
            landscape: vec![String::new(); countries],
            portrait: vec![String::new(); countries],
        }
    }

    pub fn get(&self, orientation: Orientation, country: usize) -> &str {
        let texts = match orientation {
            Orientation::Landscape => &self.landscape,
            Orientation::Portrait => &self.portrait,
        };
        texts.get(country).map(String::as_str).unwrap_or("")
    }

    fn pairs_mut<'a>(
        &'a mut self,
        other: &'a OrientedText,
    ) -> impl Iterator<Item = (&'a mut String, &'a String)> {
        self.landscape
            .iter_mut()
            .zip(other.landscape.iter())
            .chain(self.portrait.iter_mut().zip(other.portrait.iter()))
    }

    /// Newline-joins every non-empty text of `other` onto this one.
    pub fn append_lines(&mut self, other: &OrientedText) {
        for (existing, extra) in self.pairs_mut(other) {
            if extra.is_empty() {
                continue;
            }
            if existing.is_empty() {
                existing.clone_from(extra);
            } else {
                existing.push('\n');
                existing.push_str(extra);
            }
        }
    }

    /// Like `append_lines`, but skips texts already present as a line.
    pub fn append_distinct(&mut self, other: &OrientedText) {
        for (existing, extra) in self.pairs_mut(other) {
            if extra.is_empty() {
                continue;
            }
            if existing.is_empty() {
                existing.clone_from(extra);
            } else if !existing.split('\n').any(|line| line == extra.as_str()) {
                existing.push('\n');
                existing.push_str(extra);
            }
        }
    }

    fn broadcast_first(texts: &mut [String]) {
        let Some(first) = texts.iter().find(|text| !text.is_empty()).cloned() else {
            return;
        };
        for text in texts.iter_mut().filter(|text| text.is_empty()) {
            text.clone_from(&first);
        }
    }

    /// Fills empty countries with the first non-empty text, per orientation.
    pub fn broadcast(&mut self) {
        Self::broadcast_first(&mut self.landscape);
        Self::broadcast_first(&mut self.portrait);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedBlock {
    pub line: i64,
    pub timing: Timing,
    pub texts: OrientedText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub number: usize,
    pub record_type: RecordType,
    pub video_id: Option<String>,
    pub line: Option<i64>,
    pub timing: Timing,
    pub key: String,
    pub country_scope: String,
    pub metadata: String,
    pub texts: OrientedText,
}

impl Row {
    pub fn into_block(self, line: i64) -> TimedBlock {
        TimedBlock {
            line,
            timing: self.timing,
            texts: self.texts,
        }
    }

    /// Landscape text, else portrait text, for one country.
    pub fn text_for(&self, country: usize) -> &str {
        let landscape = self.texts.get(Orientation::Landscape, country);
        if landscape.is_empty() {
            self.texts.get(Orientation::Portrait, country)
        } else {
            landscape
        }
    }
}

fn clean_cell(cells: &[String], idx: Option<usize>) -> String {
    idx.and_then(|idx| cells.get(idx))
        .map(|cell| cell.replace('\r', "").trim().to_string())
        .unwrap_or_default()
}

pub struct RowClassifier<'a> {
    layout: &'a ColumnLayout,
    headers: &'a [String],
    fps: f64,
}

impl<'a> RowClassifier<'a> {
    pub fn new(layout: &'a ColumnLayout, headers: &'a [String], fps: f64) -> Self {
        Self {
            layout,
            headers,
            fps,
        }
    }

    /// `number` is the 1-based data row. Blank and unknown record types yield `None`.
    pub fn classify(&self, cells: &[String], number: usize) -> Result<Option<Row>, ConvertError> {
        let layout = self.layout;
        let tag = clean_cell(cells, Some(layout.record_type));
        if tag.is_empty() {
            return Ok(None);
        }
        let Some(record_type) = RecordType::parse(&tag) else {
            tracing::debug!(row = number, record_type = %tag, "ignoring unknown record type");
            return Ok(None);
        };

        let timing = if record_type.is_meta() {
            Timing::default()
        } else {
            Timing {
                start: self.timecode(cells, layout.start, number)?,
                end: self.timecode(cells, layout.end, number)?,
            }
        };

        let video_id = Some(clean_cell(cells, layout.video_id)).filter(|id| !id.is_empty());
        let line = clean_cell(cells, layout.line).parse::<i64>().ok();
        let country_scope = clean_cell(cells, layout.country_scope).to_uppercase();

        let mut texts = OrientedText::new(layout.countries.len());
        for (idx, country) in layout.countries.iter().enumerate() {
            texts.landscape[idx] = clean_cell(cells, Some(country.landscape));
            texts.portrait[idx] = clean_cell(cells, country.portrait);
        }
        if country_scope == "ALL" {
            texts.broadcast();
        }

        Ok(Some(Row {
            number,
            record_type,
            video_id,
            line,
            timing,
            key: clean_cell(cells, layout.key),
            country_scope,
            metadata: clean_cell(cells, layout.metadata),
            texts,
        }))
    }

    fn timecode(
        &self,
        cells: &[String],
        column: Option<usize>,
        number: usize,
    ) -> Result<Option<f64>, ConvertError> {
        let raw = clean_cell(cells, column);
        if raw.is_empty() {
            return Ok(None);
        }
        parse_timecode(&raw, self.fps)
            .map(Some)
            .map_err(|source| ConvertError::Timecode {
                row: number,
                column: column
                    .and_then(|idx| self.headers.get(idx))
                    .cloned()
                    .unwrap_or_default(),
                value: raw,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn layout_and_headers() -> (ColumnLayout, Vec<String>) {
        let headers = strings(&[
            "record_type", "video_id", "line", "start", "end", "key", "is_global",
            "country_scope", "metadata", "GBL", "GBL", "FRA", "FRA",
        ]);
        let layout = ColumnLayout::detect(&headers, 0).expect("layout");
        (layout, headers)
    }

    #[test]
    fn record_types_parse_case_insensitively() {
        assert_eq!(RecordType::parse("endFrame"), Some(RecordType::EndFrame));
        assert_eq!(RecordType::parse("end_frame"), Some(RecordType::EndFrame));
        assert_eq!(RecordType::parse("META-GLOBAL"), Some(RecordType::MetaGlobal));
        assert_eq!(RecordType::parse("super_B"), Some(RecordType::SuperB));
        assert_eq!(RecordType::parse("section"), None);
    }

    #[test]
    fn classifies_subtitle_row() {
        let (layout, headers) = layout_and_headers();
        let classifier = RowClassifier::new(&layout, &headers, 25.0);
        let cells = strings(&[
            "sub", "V1", "", "00:00:01:00", "00:00:02:00", "", "", "", "", " Hello\r", "", "Bonjour", "",
        ]);
        let row = classifier.classify(&cells, 1).expect("classify").expect("row");
        assert_eq!(row.record_type, RecordType::Subtitle);
        assert_eq!(row.video_id.as_deref(), Some("V1"));
        assert_eq!(row.line, None);
        assert_eq!(row.timing, Timing::new(1.0, 2.0));
        assert_eq!(row.texts.landscape, vec!["Hello", "Bonjour"]);
        assert_eq!(row.texts.portrait, vec!["", ""]);
    }

    #[test]
    fn all_scope_broadcasts_per_orientation() {
        let (layout, headers) = layout_and_headers();
        let classifier = RowClassifier::new(&layout, &headers, 25.0);
        let cells = strings(&[
            "claim", "", "", "", "", "", "", "all", "", "", "", "Legal", "Legal P",
        ]);
        let row = classifier.classify(&cells, 3).expect("classify").expect("row");
        assert_eq!(row.texts.landscape, vec!["Legal", "Legal"]);
        assert_eq!(row.texts.portrait, vec!["Legal P", "Legal P"]);
    }

    #[test]
    fn blank_scope_does_not_broadcast() {
        let (layout, headers) = layout_and_headers();
        let classifier = RowClassifier::new(&layout, &headers, 25.0);
        let cells = strings(&["claim", "", "", "", "", "", "", "", "", "", "", "Legal", ""]);
        let row = classifier.classify(&cells, 3).expect("classify").expect("row");
        assert_eq!(row.texts.landscape, vec!["", "Legal"]);
    }

    #[test]
    fn unknown_and_blank_rows_are_skipped() {
        let (layout, headers) = layout_and_headers();
        let classifier = RowClassifier::new(&layout, &headers, 25.0);
        let blank = vec![String::new(); headers.len()];
        assert!(classifier.classify(&blank, 1).expect("classify").is_none());
        let mut unknown = blank.clone();
        unknown[0] = "section".to_string();
        assert!(classifier.classify(&unknown, 2).expect("classify").is_none());
    }

    #[test]
    fn bad_timecode_names_row_and_column() {
        let (layout, headers) = layout_and_headers();
        let classifier = RowClassifier::new(&layout, &headers, 25.0);
        let mut cells = vec![String::new(); headers.len()];
        cells[0] = "sub".to_string();
        cells[4] = "soon".to_string();
        let err = classifier.classify(&cells, 7).unwrap_err();
        match err {
            ConvertError::Timecode { row, column, value, .. } => {
                assert_eq!(row, 7);
                assert_eq!(column, "end");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn distinct_append_skips_known_lines() {
        let mut base = OrientedText::new(1);
        base.landscape[0] = "X".to_string();
        let mut extra = OrientedText::new(1);
        extra.landscape[0] = "X".to_string();
        extra.portrait[0] = "P".to_string();
        base.append_distinct(&extra);
        assert_eq!(base.landscape[0], "X");
        assert_eq!(base.portrait[0], "P");
        extra.landscape[0] = "Y".to_string();
        base.append_distinct(&extra);
        assert_eq!(base.landscape[0], "X\nY");
    }
}
