use crate::aggregate::{Aggregated, VideoRecord};
use crate::columns::Orientation;
use crate::config::ConvertOptions;
use crate::document::{BlockItem, ClaimItem, CountryPayload, OrientedTexts, SubtitleItem, VideoEntry};
use crate::precedence::LOGO_ANIM_FLAG;
use crate::record::TimedBlock;
use crate::value::MetaValue;
use cuesheet_timing::{TimeFormat, TimeValue};
use std::collections::{BTreeMap, HashMap};

fn trimmed(block: &TimedBlock, orientation: Orientation, country: usize) -> &str {
    block.texts.get(orientation, country).trim()
}

fn slot(orientation: Orientation) -> usize {
    match orientation {
        Orientation::Landscape => 0,
        Orientation::Portrait => 1,
    }
}

/// One top-level orientation-bucketed array for a country.
#[derive(Debug, Clone, Default)]
struct TopLevel {
    landscape: Vec<String>,
    portrait: Vec<String>,
}

impl TopLevel {
    fn collect(blocks: &[TimedBlock], country: usize, skip_empty: bool, pad_empty: bool) -> Self {
        let mut top = TopLevel::default();
        for block in blocks {
            let landscape = trimmed(block, Orientation::Landscape, country);
            let portrait = trimmed(block, Orientation::Portrait, country);
            if !landscape.is_empty() || !skip_empty {
                top.landscape.push(landscape.to_string());
            }
            if !portrait.is_empty() {
                top.portrait.push(portrait.to_string());
            }
        }
        if pad_empty && top.landscape.is_empty() {
            top.landscape.push(String::new());
        }
        if top.portrait.len() < top.landscape.len() {
            let missing = top.landscape[top.portrait.len()..].to_vec();
            top.portrait.extend(missing);
        }
        top
    }

    fn get(&self, orientation: Orientation) -> &[String] {
        match orientation {
            Orientation::Landscape => &self.landscape,
            Orientation::Portrait => &self.portrait,
        }
    }

    fn to_texts(&self, no_orientation: bool) -> OrientedTexts {
        if no_orientation {
            OrientedTexts::Flat(self.landscape.clone())
        } else {
            OrientedTexts::Split {
                landscape: self.landscape.clone(),
                portrait: self.portrait.clone(),
            }
        }
    }
}

/// Global texts a per-video entry can fall back to, per orientation.
struct GlobalTexts {
    by_timing: [HashMap<(u64, u64), String>; 2],
    by_index: [Vec<String>; 2],
}

impl GlobalTexts {
    fn from_blocks(blocks: &[TimedBlock], country: usize) -> Self {
        let mut by_timing = [HashMap::new(), HashMap::new()];
        let mut by_index = [Vec::new(), Vec::new()];
        for orientation in Orientation::BOTH {
            for block in blocks {
                let text = trimmed(block, orientation, country).to_string();
                if let Some(key) = block.timing.timed_key() {
                    by_timing[slot(orientation)].insert(key, text.clone());
                }
                by_index[slot(orientation)].push(text);
            }
        }
        Self {
            by_timing,
            by_index,
        }
    }

    fn with_index(mut self, top: &TopLevel) -> Self {
        self.by_index = [top.landscape.clone(), top.portrait.clone()];
        self
    }

    fn timed(&self, orientation: Orientation, block: &TimedBlock) -> &str {
        block
            .timing
            .timed_key()
            .and_then(|key| self.by_timing[slot(orientation)].get(&key))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Entry `idx`, else the first entry, else empty.
    fn indexed(&self, orientation: Orientation, idx: usize) -> &str {
        let texts = &self.by_index[slot(orientation)];
        texts
            .get(idx)
            .or_else(|| texts.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    fn lookup(&self, orientation: Orientation, block: &TimedBlock, idx: usize) -> &str {
        let timed = self.timed(orientation, block);
        if timed.is_empty() {
            self.indexed(orientation, idx)
        } else {
            timed
        }
    }
}

struct VideoContext<'a> {
    video_id: String,
    orientation: Orientation,
    country: usize,
    options: &'a ConvertOptions,
    format: TimeFormat,
}

impl VideoContext<'_> {
    fn local_text<'b>(&self, block: &'b TimedBlock) -> &'b str {
        let text = trimmed(block, self.orientation, self.country);
        if text.is_empty() && self.orientation == Orientation::Portrait && self.options.prefer_local {
            trimmed(block, Orientation::Landscape, self.country)
        } else {
            text
        }
    }

    fn tagged(&self, text: &str) -> String {
        if self.options.test_mode && !text.is_empty() {
            format!("{}_{}", self.video_id, text)
        } else {
            text.to_string()
        }
    }

    fn times(&self, block: &TimedBlock) -> (Option<TimeValue>, Option<TimeValue>) {
        match (block.timing.start, block.timing.end) {
            (Some(start), Some(end)) => (Some(self.format.format(start)), Some(self.format.format(end))),
            _ => (None, None),
        }
    }

    fn claims(&self, blocks: &[TimedBlock], globals: &GlobalTexts) -> Vec<ClaimItem> {
        let mut items: Vec<ClaimItem> = blocks
            .iter()
            .enumerate()
            .map(|(idx, block)| {
                let local = self.local_text(block);
                let text = if local.is_empty() {
                    globals.lookup(self.orientation, block, idx)
                } else {
                    local
                };
                let (in_time, out) = self.times(block);
                ClaimItem {
                    line: block.line,
                    text: self.tagged(text),
                    in_time,
                    out,
                }
            })
            .collect();

        if items.len() == 1 {
            let only = &items[0];
            let top = &globals.by_index[slot(self.orientation)];
            let text = top
                .get(1)
                .or_else(|| top.first())
                .map(|text| self.tagged(text))
                .unwrap_or_else(|| only.text.clone());
            let second = ClaimItem {
                line: 2,
                text,
                in_time: only.in_time.clone(),
                out: only.out.clone(),
            };
            items.push(second);
        }
        items
    }

    fn blocks(&self, blocks: &[TimedBlock], globals: &GlobalTexts) -> Vec<BlockItem> {
        blocks
            .iter()
            .enumerate()
            .map(|(idx, block)| {
                let local = self.local_text(block);
                let mut global = globals.lookup(self.orientation, block, idx);
                if self.orientation == Orientation::Portrait && local.is_empty() && global.is_empty() {
                    global = globals.timed(Orientation::Landscape, block);
                    if global.is_empty() {
                        global = globals.by_index[slot(Orientation::Landscape)]
                            .get(idx)
                            .map(String::as_str)
                            .unwrap_or("");
                    }
                }
                let text = if self.options.prefer_local && !local.is_empty() {
                    local
                } else {
                    global
                };
                let (in_time, out) = self.times(block);
                BlockItem {
                    line: block.line,
                    text: self.tagged(text),
                    in_time,
                    out,
                }
            })
            .collect()
    }

    fn lines(&self, blocks: &[TimedBlock]) -> Vec<SubtitleItem> {
        blocks
            .iter()
            .filter_map(|block| {
                let landscape = trimmed(block, Orientation::Landscape, self.country);
                if self.options.skip_empty_text && landscape.is_empty() {
                    return None;
                }
                let (Some(start), Some(end)) = (block.timing.start, block.timing.end) else {
                    return None;
                };
                let text = match self.orientation {
                    Orientation::Landscape => landscape,
                    Orientation::Portrait => {
                        let portrait = trimmed(block, Orientation::Portrait, self.country);
                        if portrait.is_empty() {
                            landscape
                        } else {
                            portrait
                        }
                    }
                };
                Some(SubtitleItem {
                    line: block.line,
                    in_time: self.format.format(start),
                    out: self.format.format(end),
                    text: text.to_string(),
                })
            })
            .collect()
    }
}

fn cast_map(values: &BTreeMap<String, String>, cast: bool) -> BTreeMap<String, MetaValue> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), MetaValue::from_raw(value, cast)))
        .collect()
}

fn prefer<'b>(own: &'b [TimedBlock], global: &'b [TimedBlock]) -> &'b [TimedBlock] {
    if own.is_empty() {
        global
    } else {
        own
    }
}

pub fn assemble(aggregated: &Aggregated, options: &ConvertOptions) -> Vec<(String, CountryPayload)> {
    aggregated
        .countries
        .iter()
        .enumerate()
        .map(|(country, code)| (code.clone(), assemble_country(aggregated, country, options)))
        .collect()
}

pub fn assemble_country(aggregated: &Aggregated, country: usize, options: &ConvertOptions) -> CountryPayload {
    let code = aggregated.countries[country].as_str();
    let global = &aggregated.global;
    let skip_empty = options.skip_empty_text;

    let claim = TopLevel::collect(&global.claims, country, skip_empty, false);
    let disclaimer = TopLevel::collect(&global.disclaimers, country, skip_empty, true);
    let disclaimer_02 = TopLevel::collect(&global.disclaimers_02, country, skip_empty, true);
    let logo = TopLevel::collect(&global.logos, country, skip_empty, false);

    let claim_globals = GlobalTexts::from_blocks(&global.claims, country).with_index(&claim);
    let disclaimer_globals = GlobalTexts::from_blocks(&global.disclaimers, country);
    let disclaimer_02_globals = GlobalTexts::from_blocks(&global.disclaimers_02, country);
    let logo_globals = GlobalTexts::from_blocks(&global.logos, country);
    let end_frame_globals = GlobalTexts::from_blocks(&global.end_frames, country);

    let mut videos = Vec::with_capacity(aggregated.videos.len() * 2);
    for video in &aggregated.videos {
        let metadata = video_metadata(aggregated, video, country, code);
        let empty = Default::default();
        let own = aggregated.video_tracks(&video.video_id).unwrap_or(&empty);
        for orientation in Orientation::BOTH {
            let ctx = VideoContext {
                video_id: format!("{}_{}", video.video_id, orientation.as_str()),
                orientation,
                country,
                options,
                format: options.time_format(),
            };
            let mut meta = cast_map(&metadata, options.cast_metadata);
            meta.insert("orientation".to_string(), MetaValue::text(orientation.as_str()));

            let claims = ctx.claims(prefer(&own.claims, &global.claims), &claim_globals);
            let (claim, claim_objects) = if options.claims_as_objects {
                let objects = claims
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| (format!("claim_{:02}", idx + 1), vec![item]))
                    .collect();
                (None, objects)
            } else {
                (Some(claims), BTreeMap::new())
            };

            videos.push(VideoEntry {
                metadata: meta,
                subtitles: ctx.lines(&own.subtitles),
                super_a: ctx.lines(&own.super_a),
                super_b: ctx.lines(&own.super_b),
                claim,
                claim_objects,
                disclaimer: ctx.blocks(prefer(&own.disclaimers, &global.disclaimers), &disclaimer_globals),
                disclaimer_02: ctx.blocks(
                    prefer(&own.disclaimers_02, &global.disclaimers_02),
                    &disclaimer_02_globals,
                ),
                logo: ctx.blocks(prefer(&own.logos, &global.logos), &logo_globals),
                end_frame: ctx.blocks(prefer(&own.end_frames, &global.end_frames), &end_frame_globals),
                video_id: ctx.video_id,
            });
        }
    }

    tracing::debug!(
        country = code,
        claims = claim.landscape.len(),
        disclaimers = disclaimer.landscape.len(),
        logos = logo.landscape.len(),
        videos = videos.len(),
        "assembled country payload"
    );

    CountryPayload {
        metadata_global: global_metadata(aggregated, country, options),
        claim: claim.to_texts(options.no_orientation),
        disclaimer: disclaimer.to_texts(options.no_orientation),
        disclaimer_02: disclaimer_02.to_texts(options.no_orientation),
        logo: logo.to_texts(options.no_orientation),
        videos,
    }
}

fn video_metadata(
    aggregated: &Aggregated,
    video: &VideoRecord,
    country: usize,
    code: &str,
) -> BTreeMap<String, String> {
    let mut metadata = video.metadata.clone();
    let no_overrides = BTreeMap::new();
    let overrides = video.flag_overrides.get(country).unwrap_or(&no_overrides);
    let flags = aggregated
        .metadata
        .flags
        .resolve_for_video(country, code, video.duration(), overrides);
    metadata.extend(flags);
    metadata
}

fn global_metadata(aggregated: &Aggregated, country: usize, options: &ConvertOptions) -> BTreeMap<String, MetaValue> {
    let store = &aggregated.metadata;
    let mut metadata = cast_map(&store.values, options.cast_metadata);
    if options.logo_anim_overview && !store.flags.logo_anim.is_empty() {
        metadata
            .entry(LOGO_ANIM_FLAG.to_string())
            .or_insert_with(|| MetaValue::Flags(store.flags.logo_anim.overview()));
    }
    metadata.insert("jobNumber".to_string(), MetaValue::text(store.job_number(country)));
    metadata.insert("language".to_string(), MetaValue::text(store.language(country)));
    metadata.remove("orientation");
    metadata
        .entry("schemaVersion".to_string())
        .or_insert_with(|| MetaValue::text(options.schema_version.as_str()));
    metadata
        .entry("country".to_string())
        .or_insert_with(|| MetaValue::text(aggregated.countries[country].as_str()));
    metadata
}
