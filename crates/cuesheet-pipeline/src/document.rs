use crate::precedence::LOGO_ANIM_FLAG;
use crate::sectioned::SectionedOutput;
use crate::value::MetaValue;
use cuesheet_timing::TimeValue;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

pub const SAMPLE_TOP_CLAIMS: usize = 2;
pub const SAMPLE_TOP_DISCLAIMERS: usize = 1;
pub const SAMPLE_TOP_LOGOS: usize = 1;
pub const SAMPLE_VIDEOS: usize = 2;
pub const SAMPLE_SUBTITLES: usize = 5;
pub const SAMPLE_VIDEO_CLAIMS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrientedTexts {
    Split {
        landscape: Vec<String>,
        portrait: Vec<String>,
    },
    Flat(Vec<String>),
}

impl OrientedTexts {
    pub fn landscape(&self) -> &[String] {
        match self {
            OrientedTexts::Split { landscape, .. } => landscape,
            OrientedTexts::Flat(texts) => texts,
        }
    }

    pub fn portrait(&self) -> Option<&[String]> {
        match self {
            OrientedTexts::Split { portrait, .. } => Some(portrait),
            OrientedTexts::Flat(_) => None,
        }
    }

    fn truncate(&mut self, limit: usize) {
        match self {
            OrientedTexts::Split {
                landscape,
                portrait,
            } => {
                landscape.truncate(limit);
                portrait.truncate(limit);
            }
            OrientedTexts::Flat(texts) => texts.truncate(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleItem {
    pub line: i64,
    #[serde(rename = "in")]
    pub in_time: TimeValue,
    pub out: TimeValue,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimItem {
    pub line: i64,
    pub text: String,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_time: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<TimeValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockItem {
    pub line: i64,
    pub text: String,
    #[serde(rename = "in")]
    pub in_time: Option<TimeValue>,
    pub out: Option<TimeValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoEntry {
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub metadata: BTreeMap<String, MetaValue>,
    pub subtitles: Vec<SubtitleItem>,
    #[serde(rename = "super_A")]
    pub super_a: Vec<SubtitleItem>,
    #[serde(rename = "super_B")]
    pub super_b: Vec<SubtitleItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<Vec<ClaimItem>>,
    #[serde(flatten)]
    pub claim_objects: BTreeMap<String, Vec<ClaimItem>>,
    pub disclaimer: Vec<BlockItem>,
    pub disclaimer_02: Vec<BlockItem>,
    pub logo: Vec<BlockItem>,
    #[serde(rename = "endFrame")]
    pub end_frame: Vec<BlockItem>,
}

impl VideoEntry {
    pub fn orientation(&self) -> Option<&str> {
        self.metadata.get("orientation").and_then(MetaValue::as_text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryPayload {
    #[serde(rename = "metadataGlobal")]
    pub metadata_global: BTreeMap<String, MetaValue>,
    pub claim: OrientedTexts,
    pub disclaimer: OrientedTexts,
    pub disclaimer_02: OrientedTexts,
    pub logo: OrientedTexts,
    pub videos: Vec<VideoEntry>,
}

impl CountryPayload {
    pub fn language(&self) -> Option<&str> {
        self.metadata_global
            .get("language")
            .and_then(MetaValue::as_text)
            .filter(|language| !language.is_empty())
    }

    /// Replaces nested `logo_anim_flag` entries with the value this country sees.
    pub fn trim_logo_anim_overview(&mut self, country: &str) {
        if let Some(MetaValue::Flags(overview)) = self.metadata_global.get(LOGO_ANIM_FLAG) {
            let trimmed = overview.for_country(country);
            self.metadata_global
                .insert(LOGO_ANIM_FLAG.to_string(), MetaValue::Flags(trimmed));
        }
    }

    pub fn sample(&self) -> CountryPayload {
        let mut sampled = self.clone();
        sampled.claim.truncate(SAMPLE_TOP_CLAIMS);
        sampled.disclaimer.truncate(SAMPLE_TOP_DISCLAIMERS);
        sampled.disclaimer_02.truncate(SAMPLE_TOP_DISCLAIMERS);
        sampled.logo.truncate(SAMPLE_TOP_LOGOS);
        sampled.videos.truncate(SAMPLE_VIDEOS);
        for video in &mut sampled.videos {
            video.subtitles.truncate(SAMPLE_SUBTITLES);
            if let Some(claims) = video.claim.as_mut() {
                claims.truncate(SAMPLE_VIDEO_CLAIMS);
            }
            let keep: Vec<String> = video
                .claim_objects
                .keys()
                .take(SAMPLE_VIDEO_CLAIMS)
                .cloned()
                .collect();
            video.claim_objects.retain(|key, _| keep.contains(key));
        }
        sampled
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiCountryDocument {
    #[serde(rename = "_multi")]
    pub multi: bool,
    pub countries: Vec<String>,
    #[serde(rename = "byCountry", serialize_with = "serialize_pairs")]
    pub by_country: Vec<(String, CountryPayload)>,
    #[serde(skip)]
    pub variant_counts: Vec<(String, usize)>,
}

impl MultiCountryDocument {
    pub fn payload(&self, country: &str) -> Option<&CountryPayload> {
        self.by_country
            .iter()
            .find(|(code, _)| code == country)
            .map(|(_, payload)| payload)
    }

    pub fn variant_count(&self, country: &str) -> usize {
        self.variant_counts
            .iter()
            .find(|(code, _)| code == country)
            .map_or(1, |(_, count)| *count)
    }
}

pub(crate) fn serialize_pairs<S: Serializer, T: Serialize>(
    pairs: &[(String, T)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (code, payload) in pairs {
        map.serialize_entry(code, payload)?;
    }
    map.end()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimpleDocument {
    pub subtitles: Vec<SubtitleItem>,
}

impl SimpleDocument {
    pub fn sample(&self) -> SimpleDocument {
        SimpleDocument {
            subtitles: self.subtitles.iter().take(SAMPLE_SUBTITLES).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConversionOutput {
    Unified(MultiCountryDocument),
    Sectioned(SectionedOutput),
    Simple(SimpleDocument),
}

impl ConversionOutput {
    pub fn countries(&self) -> &[String] {
        match self {
            ConversionOutput::Unified(document) => &document.countries,
            ConversionOutput::Sectioned(SectionedOutput::Multi(document)) => &document.countries,
            ConversionOutput::Sectioned(SectionedOutput::Single(_)) | ConversionOutput::Simple(_) => &[],
        }
    }
}
