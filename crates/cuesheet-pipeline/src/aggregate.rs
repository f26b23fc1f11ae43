use crate::config::ConvertOptions;
use crate::merge::{dedup_blocks, join_by_timing, merge_blocks, merge_lines};
use crate::precedence::{country_flag_key, is_logo_anim_flag, FlagDefaults, LOGO_ANIM_FLAG};
use crate::record::{Numbering, RecordType, Row, TimedBlock};
use std::collections::{BTreeMap, HashMap};

pub const NO_JOB_NUMBER: &str = "noJobNumber";

/// Timed rows of one scope (global, or a single video), by record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tracks {
    pub subtitles: Vec<TimedBlock>,
    pub super_a: Vec<TimedBlock>,
    pub super_b: Vec<TimedBlock>,
    pub claims: Vec<TimedBlock>,
    pub disclaimers: Vec<TimedBlock>,
    pub disclaimers_02: Vec<TimedBlock>,
    pub logos: Vec<TimedBlock>,
    pub end_frames: Vec<TimedBlock>,
}

impl Tracks {
    fn bucket_mut(&mut self, record_type: RecordType) -> Option<&mut Vec<TimedBlock>> {
        match record_type {
            RecordType::Subtitle => Some(&mut self.subtitles),
            RecordType::SuperA => Some(&mut self.super_a),
            RecordType::SuperB => Some(&mut self.super_b),
            RecordType::Claim => Some(&mut self.claims),
            RecordType::Disclaimer => Some(&mut self.disclaimers),
            RecordType::Disclaimer02 => Some(&mut self.disclaimers_02),
            RecordType::Logo => Some(&mut self.logos),
            RecordType::EndFrame => Some(&mut self.end_frames),
            RecordType::MetaGlobal | RecordType::MetaLocal => None,
        }
    }

    fn finish(self, options: &ConvertOptions) -> Tracks {
        let lines = |blocks: Vec<TimedBlock>| {
            let merged = if options.merge_subtitles {
                merge_lines(blocks)
            } else {
                blocks
            };
            dedup_blocks(merged)
        };
        let blocks = |blocks: Vec<TimedBlock>, enabled: bool| {
            if enabled {
                merge_blocks(blocks)
            } else {
                blocks
            }
        };
        Tracks {
            subtitles: lines(self.subtitles),
            super_a: lines(self.super_a),
            super_b: lines(self.super_b),
            claims: if options.join_claim {
                join_by_timing(self.claims)
            } else {
                self.claims
            },
            disclaimers: blocks(self.disclaimers, options.merge_disclaimer),
            disclaimers_02: blocks(self.disclaimers_02, options.merge_disclaimer_02),
            logos: blocks(self.logos, true),
            end_frames: blocks(self.end_frames, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    pub video_id: String,
    pub metadata: BTreeMap<String, String>,
    /// Flag overrides from `meta_local` rows, indexed by country position.
    pub flag_overrides: Vec<BTreeMap<String, String>>,
}

impl VideoRecord {
    fn new(video_id: &str, countries: usize) -> Self {
        Self {
            video_id: video_id.to_string(),
            metadata: BTreeMap::new(),
            flag_overrides: vec![BTreeMap::new(); countries],
        }
    }

    pub fn duration(&self) -> Option<&str> {
        self.metadata
            .get("duration")
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalMetadata {
    pub values: BTreeMap<String, String>,
    pub job_numbers: Vec<Option<String>>,
    pub languages: Vec<Option<String>>,
    pub flags: FlagDefaults,
}

impl GlobalMetadata {
    fn new(countries: usize) -> Self {
        Self {
            values: BTreeMap::new(),
            job_numbers: vec![None; countries],
            languages: vec![None; countries],
            flags: FlagDefaults::new(countries),
        }
    }

    pub fn job_number(&self, country: usize) -> &str {
        self.job_numbers
            .get(country)
            .and_then(|value| value.as_deref())
            .unwrap_or(NO_JOB_NUMBER)
    }

    pub fn language(&self, country: usize) -> &str {
        self.languages
            .get(country)
            .and_then(|value| value.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Default)]
struct LineCounters {
    counters: HashMap<(RecordType, Option<String>), i64>,
}

impl LineCounters {
    fn assign(
        &mut self,
        record_type: RecordType,
        video_id: Option<&str>,
        explicit: Option<i64>,
        seed: i64,
    ) -> i64 {
        let counter = self
            .counters
            .entry((record_type, video_id.map(str::to_string)))
            .or_insert(seed);
        match (record_type.numbering(), explicit) {
            (Numbering::Sequential, Some(line)) => line,
            (Numbering::Sticky, Some(line)) => {
                *counter = line;
                line
            }
            (Numbering::Sticky, None) => *counter,
            (Numbering::Following, Some(line)) => {
                *counter = line + 1;
                line
            }
            (Numbering::Sequential | Numbering::Following, None) => {
                let line = *counter;
                *counter += 1;
                line
            }
        }
    }
}

/// Everything collected from one table, merged and ready for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub countries: Vec<String>,
    pub global: Tracks,
    pub per_video: BTreeMap<String, Tracks>,
    pub videos: Vec<VideoRecord>,
    pub metadata: GlobalMetadata,
}

impl Aggregated {
    pub fn video_tracks(&self, video_id: &str) -> Option<&Tracks> {
        self.per_video.get(video_id)
    }
}

/// Single-pass accumulator owning every counter and collection for one conversion.
pub struct Aggregator<'a> {
    options: &'a ConvertOptions,
    countries: Vec<String>,
    counters: LineCounters,
    global: Tracks,
    per_video: BTreeMap<String, Tracks>,
    videos: Vec<VideoRecord>,
    video_positions: HashMap<String, usize>,
    metadata: GlobalMetadata,
}

impl<'a> Aggregator<'a> {
    pub fn new(countries: Vec<String>, options: &'a ConvertOptions) -> Self {
        let count = countries.len();
        Self {
            options,
            countries,
            counters: LineCounters::default(),
            global: Tracks::default(),
            per_video: BTreeMap::new(),
            videos: Vec::new(),
            video_positions: HashMap::new(),
            metadata: GlobalMetadata::new(count),
        }
    }

    pub fn push(&mut self, row: Row) {
        match row.record_type {
            RecordType::MetaGlobal => self.push_meta_global(&row),
            RecordType::MetaLocal => self.push_meta_local(&row),
            RecordType::Subtitle | RecordType::SuperA | RecordType::SuperB => self.push_line(row),
            _ => self.push_track(row),
        }
    }

    pub fn finish(self) -> Aggregated {
        let options = self.options;
        Aggregated {
            countries: self.countries,
            global: self.global.finish(options),
            per_video: self
                .per_video
                .into_iter()
                .map(|(video_id, tracks)| (video_id, tracks.finish(options)))
                .collect(),
            videos: self.videos,
            metadata: self.metadata,
        }
    }

    fn video_mut(&mut self, video_id: &str) -> &mut VideoRecord {
        let countries = self.countries.len();
        let position = *self
            .video_positions
            .entry(video_id.to_string())
            .or_insert_with(|| {
                self.videos.push(VideoRecord::new(video_id, countries));
                self.videos.len() - 1
            });
        &mut self.videos[position]
    }

    fn push_line(&mut self, row: Row) {
        let Some(video_id) = row.video_id.clone() else {
            tracing::warn!(row = row.number, record_type = row.record_type.label(), "skipping row without video_id");
            return;
        };
        self.video_mut(&video_id);
        let line = self.counters.assign(
            row.record_type,
            Some(&video_id),
            row.line,
            self.options.start_line_index,
        );
        let record_type = row.record_type;
        let tracks = self.per_video.entry(video_id).or_default();
        if let Some(bucket) = tracks.bucket_mut(record_type) {
            bucket.push(row.into_block(line));
        }
    }

    fn push_track(&mut self, row: Row) {
        let record_type = row.record_type;
        let line = self
            .counters
            .assign(record_type, row.video_id.as_deref(), row.line, 1);
        let tracks = match row.video_id.clone() {
            Some(video_id) => self.per_video.entry(video_id).or_default(),
            None => &mut self.global,
        };
        if let Some(bucket) = tracks.bucket_mut(record_type) {
            bucket.push(row.into_block(line));
        }
    }

    fn push_meta_global(&mut self, row: &Row) {
        let key = row.key.as_str();
        if key.is_empty() {
            tracing::warn!(row = row.number, "skipping meta_global row without key");
            return;
        }
        let countries = self.countries.len();
        let metadata = &mut self.metadata;

        if key.eq_ignore_ascii_case("jobNumber") {
            for country in 0..countries {
                let value = row.text_for(country);
                if !value.is_empty() {
                    metadata.job_numbers[country] = Some(value.to_string());
                }
            }
            for slot in metadata.job_numbers.iter_mut().filter(|slot| slot.is_none()) {
                let fallback = if row.metadata.is_empty() {
                    NO_JOB_NUMBER
                } else {
                    row.metadata.as_str()
                };
                *slot = Some(fallback.to_string());
            }
            return;
        }

        if let Some(flag) = country_flag_key(key) {
            for country in 0..countries {
                let value = Some(row.text_for(country))
                    .filter(|value| !value.is_empty())
                    .unwrap_or(row.metadata.as_str());
                metadata.flags.set(country, flag, value);
            }
            return;
        }

        if key.eq_ignore_ascii_case("language") {
            for country in 0..countries {
                let value = [
                    row.texts.portrait[country].as_str(),
                    row.texts.landscape[country].as_str(),
                    row.metadata.as_str(),
                ]
                .into_iter()
                .find(|value| !value.is_empty())
                .unwrap_or("");
                metadata.languages[country] = Some(value.to_string());
            }
            return;
        }

        if is_logo_anim_flag(key) {
            let values = self.countries.iter().enumerate().map(|(country, code)| {
                let portrait = row.texts.portrait[country].as_str();
                let value = if portrait.is_empty() {
                    row.texts.landscape[country].as_str()
                } else {
                    portrait
                };
                (code.as_str(), value)
            });
            metadata
                .flags
                .logo_anim
                .record(&row.country_scope, &row.metadata, values);
            return;
        }

        let value = first_landscape(row).unwrap_or(row.metadata.as_str());
        if !value.is_empty() {
            metadata.values.insert(key.to_string(), value.to_string());
        }
    }

    fn push_meta_local(&mut self, row: &Row) {
        let key = row.key.as_str();
        let Some(video_id) = row.video_id.as_deref() else {
            return;
        };
        if key.is_empty() {
            return;
        }
        let countries = self.countries.len();
        let flag = country_flag_key(key).or_else(|| is_logo_anim_flag(key).then_some(LOGO_ANIM_FLAG));
        let video = self.video_mut(video_id);
        match flag {
            Some(flag) => {
                for country in 0..countries {
                    let value = Some(row.text_for(country))
                        .filter(|value| !value.is_empty())
                        .unwrap_or(row.metadata.as_str());
                    if !value.is_empty() {
                        video.flag_overrides[country].insert(flag.to_string(), value.to_string());
                    }
                }
            }
            None => {
                let value = first_landscape(row).unwrap_or(row.metadata.as_str());
                if !value.is_empty() {
                    video.metadata.insert(key.to_string(), value.to_string());
                }
            }
        }
    }
}

fn first_landscape(row: &Row) -> Option<&str> {
    row.texts
        .landscape
        .iter()
        .map(String::as_str)
        .find(|value| !value.is_empty())
}
