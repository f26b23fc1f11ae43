use cuesheet_pipeline::document::{OrientedTexts, SimpleDocument, SubtitleItem};
use cuesheet_pipeline::{CountryPayload, SectionedPayload};
use serde::Serialize;

pub const DEFAULT_REQUIRED_GLOBAL_KEYS: &str = "briefVersion,fps";
const DISABLED_KEY_LISTS: [&str; 6] = ["", "\"\"", "none", "off", "disable", "disabled"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    pub required_global_keys: Vec<String>,
    pub missing_keys_warn: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            required_global_keys: parse_required_keys(DEFAULT_REQUIRED_GLOBAL_KEYS),
            missing_keys_warn: false,
        }
    }
}

/// Comma separated key list; `none`, `off` and friends disable the check.
pub fn parse_required_keys(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if DISABLED_KEY_LISTS.contains(&raw.to_ascii_lowercase().as_str()) {
        return Vec::new();
    }
    raw.split(',')
        .map(|key| key.trim().trim_matches(['"', '\'']))
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PayloadIssues {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PayloadIssues {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    fn check_timeline(&mut self, path: &str, items: &[SubtitleItem]) {
        let mut prev_out: Option<f64> = None;
        for (idx, item) in items.iter().enumerate() {
            let (Some(start), Some(end)) = (item.in_time.as_seconds(), item.out.as_seconds()) else {
                continue;
            };
            if start > end {
                self.errors
                    .push(format!("{path}[{idx}] in > out ({start} > {end})"));
            }
            if let Some(prev) = prev_out.filter(|prev| start < *prev) {
                self.errors.push(format!(
                    "{path}[{idx}] overlaps previous (start {start} < prev end {prev})"
                ));
            }
            prev_out = Some(end);
        }
    }

    fn check_orientation_array(&mut self, name: &str, texts: &OrientedTexts) {
        let OrientedTexts::Split { landscape, portrait } = texts else {
            return;
        };
        if !landscape.is_empty() && portrait.is_empty() {
            self.warnings.push(format!(
                "{name}: portrait empty while landscape has data (expected mirror)"
            ));
        }
        if !landscape.is_empty() && !portrait.is_empty() && landscape.len() != portrait.len() {
            self.warnings.push(format!(
                "{name}: landscape/portrait length mismatch {}!={}",
                landscape.len(),
                portrait.len()
            ));
        }
    }
}

pub fn validate_payload(payload: &CountryPayload, options: &ValidationOptions) -> PayloadIssues {
    let mut issues = PayloadIssues::default();

    issues.check_orientation_array("claim", &payload.claim);
    issues.check_orientation_array("disclaimer", &payload.disclaimer);
    issues.check_orientation_array("disclaimer_02", &payload.disclaimer_02);
    issues.check_orientation_array("logo", &payload.logo);

    for key in &options.required_global_keys {
        if payload.metadata_global.contains_key(key) {
            continue;
        }
        let message = format!("metadataGlobal missing required key '{key}'");
        if options.missing_keys_warn {
            tracing::warn!(key = %key, "required global key missing");
            issues.warnings.push(message);
        } else {
            issues.errors.push(message);
        }
    }

    for (idx, video) in payload.videos.iter().enumerate() {
        let expected = ["landscape", "portrait"]
            .into_iter()
            .find(|suffix| video.video_id.ends_with(&format!("_{suffix}")));
        match (expected, video.orientation()) {
            (None, _) => issues
                .warnings
                .push(format!("videos[{idx}].videoId missing orientation suffix")),
            (Some(expected), Some(actual)) if actual != expected => issues.errors.push(format!(
                "videos[{idx}].metadata.orientation '{actual}' != expected '{expected}'"
            )),
            (Some(expected), None) => issues.errors.push(format!(
                "videos[{idx}].metadata.orientation 'None' != expected '{expected}'"
            )),
            _ => {}
        }
        if video.orientation().is_none() {
            issues
                .warnings
                .push(format!("videos[{idx}].metadata missing orientation"));
        }

        issues.check_timeline(&format!("videos[{idx}].subtitles"), &video.subtitles);
        issues.check_timeline(&format!("videos[{idx}].super_A"), &video.super_a);
        issues.check_timeline(&format!("videos[{idx}].super_B"), &video.super_b);
    }

    issues
}

pub fn validate_simple(document: &SimpleDocument) -> PayloadIssues {
    let mut issues = PayloadIssues::default();
    issues.check_timeline("subtitles", &document.subtitles);
    issues
}

/// Timing checks for each section of a sectioned export; it carries no `metadataGlobal`.
pub fn validate_sectioned(payload: &SectionedPayload) -> PayloadIssues {
    let mut issues = PayloadIssues::default();
    issues.check_timeline("subtitles", &payload.subtitles);
    issues.check_timeline("claim", &payload.claim);
    issues.check_timeline("disclaimer", &payload.disclaimer);
    issues.check_timeline("disclaimer_02", &payload.disclaimer_02);
    issues
}
