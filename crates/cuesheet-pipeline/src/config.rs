use cuesheet_timing::TimeFormat;
use serde::Deserialize;

pub const DEFAULT_SCHEMA_VERSION: &str = "v2";

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub fps: f64,
    pub start_line_index: i64,
    pub round_digits: Option<u32>,
    pub times_as_string: bool,
    pub strip_text: bool,
    pub skip_empty_text: bool,
    pub encoding: String,
    pub delimiter: String,
    pub start_col: Option<String>,
    pub end_col: Option<String>,
    pub text_col: Option<String>,
    pub schema_version: String,
    pub merge_subtitles: bool,
    pub merge_disclaimer: bool,
    pub merge_disclaimer_02: bool,
    pub cast_metadata: bool,
    pub join_claim: bool,
    pub prefer_local: bool,
    pub test_mode: bool,
    pub claims_as_objects: bool,
    pub no_orientation: bool,
    pub country_variant_index: Option<usize>,
    pub logo_anim_overview: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            fps: 25.0,
            start_line_index: 1,
            round_digits: Some(2),
            times_as_string: false,
            strip_text: true,
            skip_empty_text: true,
            encoding: "utf-8-sig".to_string(),
            delimiter: "auto".to_string(),
            start_col: None,
            end_col: None,
            text_col: None,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            merge_subtitles: true,
            merge_disclaimer: true,
            merge_disclaimer_02: true,
            cast_metadata: false,
            join_claim: false,
            prefer_local: true,
            test_mode: false,
            claims_as_objects: false,
            no_orientation: false,
            country_variant_index: None,
            logo_anim_overview: true,
        }
    }
}

impl ConvertOptions {
    pub fn time_format(&self) -> TimeFormat {
        TimeFormat {
            round_digits: self.round_digits,
            as_string: self.times_as_string,
        }
    }

    pub fn set_round(&mut self, round: i32) {
        self.round_digits = TimeFormat::from_round(round, self.times_as_string).round_digits;
    }

    pub fn variant_index(&self) -> usize {
        self.country_variant_index.unwrap_or(0)
    }

    pub fn from_toml(toml_src: &str) -> Result<Self, String> {
        let mut options = ConvertOptions::default();
        options.apply_toml(toml_src)?;
        Ok(options)
    }

    pub fn apply_toml(&mut self, toml_src: &str) -> Result<(), String> {
        let raw: RawConvertConfig =
            toml::from_str(toml_src).map_err(|err| format!("invalid config: {err}"))?;
        raw.apply(self)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConvertConfig {
    fps: Option<f64>,
    start_line_index: Option<i64>,
    round: Option<i32>,
    times_as_string: Option<bool>,
    strip_text: Option<bool>,
    skip_empty_text: Option<bool>,
    encoding: Option<String>,
    delimiter: Option<String>,
    start_col: Option<String>,
    end_col: Option<String>,
    text_col: Option<String>,
    schema_version: Option<String>,
    merge_subtitles: Option<bool>,
    merge_disclaimer: Option<bool>,
    merge_disclaimer_02: Option<bool>,
    cast_metadata: Option<bool>,
    join_claim: Option<bool>,
    prefer_local: Option<bool>,
    test_mode: Option<bool>,
    claims_as_objects: Option<bool>,
    no_orientation: Option<bool>,
    country_variant_index: Option<usize>,
    logo_anim_overview: Option<bool>,
}

impl RawConvertConfig {
    fn apply(self, options: &mut ConvertOptions) -> Result<(), String> {
        if let Some(fps) = self.fps {
            if fps <= 0.0 {
                return Err(format!("fps must be positive, got {fps}"));
            }
            options.fps = fps;
        }
        if let Some(start) = self.start_line_index {
            options.start_line_index = start;
        }
        if let Some(as_string) = self.times_as_string {
            options.times_as_string = as_string;
        }
        if let Some(round) = self.round {
            options.set_round(round);
        }
        set(&mut options.strip_text, self.strip_text);
        set(&mut options.skip_empty_text, self.skip_empty_text);
        set(&mut options.encoding, self.encoding);
        set(&mut options.delimiter, self.delimiter);
        if self.start_col.is_some() {
            options.start_col = self.start_col;
        }
        if self.end_col.is_some() {
            options.end_col = self.end_col;
        }
        if self.text_col.is_some() {
            options.text_col = self.text_col;
        }
        set(&mut options.schema_version, self.schema_version);
        set(&mut options.merge_subtitles, self.merge_subtitles);
        set(&mut options.merge_disclaimer, self.merge_disclaimer);
        set(&mut options.merge_disclaimer_02, self.merge_disclaimer_02);
        set(&mut options.cast_metadata, self.cast_metadata);
        set(&mut options.join_claim, self.join_claim);
        set(&mut options.prefer_local, self.prefer_local);
        set(&mut options.test_mode, self.test_mode);
        set(&mut options.claims_as_objects, self.claims_as_objects);
        set(&mut options.no_orientation, self.no_orientation);
        set(&mut options.logo_anim_overview, self.logo_anim_overview);
        if self.country_variant_index.is_some() {
            options.country_variant_index = self.country_variant_index;
        }
        Ok(())
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_converter_defaults() {
        let options = ConvertOptions::default();
        assert_eq!(options.fps, 25.0);
        assert_eq!(options.round_digits, Some(2));
        assert_eq!(options.schema_version, "v2");
        assert!(options.skip_empty_text);
        assert!(options.prefer_local);
        assert!(!options.join_claim);
        assert_eq!(options.variant_index(), 0);
    }

    #[test]
    fn toml_overrides_subset() {
        let options = ConvertOptions::from_toml(
            r#"
fps = 30.0
round = -1
join_claim = true
delimiter = "semicolon"
"#,
        )
        .expect("parse config");
        assert_eq!(options.fps, 30.0);
        assert_eq!(options.round_digits, None);
        assert!(options.join_claim);
        assert_eq!(options.delimiter, "semicolon");
        assert!(options.merge_subtitles);
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        let err = ConvertOptions::from_toml("frames_per_second = 25.0\n").unwrap_err();
        assert!(err.contains("invalid config"), "{err}");
    }

    #[test]
    fn toml_rejects_non_positive_fps() {
        let err = ConvertOptions::from_toml("fps = 0.0\n").unwrap_err();
        assert!(err.contains("fps must be positive"), "{err}");
    }
}
