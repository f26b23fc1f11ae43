use clap::Args;
use cuesheet_pipeline::ConvertOptions;
use std::fs;
use std::path::PathBuf;

/// Conversion knobs shared by every subcommand. Flags override `--config` values.
#[derive(Args, Debug, Default)]
pub struct ConversionFlags {
    /// TOML file with conversion defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub fps: Option<f64>,
    #[arg(long)]
    pub start_line: Option<i64>,
    /// Digits to round times to; -1 disables rounding.
    #[arg(long, allow_negative_numbers = true)]
    pub round: Option<i32>,
    #[arg(long)]
    pub times_as_string: bool,
    #[arg(long)]
    pub no_strip_text: bool,
    #[arg(long)]
    pub keep_empty_text: bool,
    #[arg(long)]
    pub encoding: Option<String>,
    /// auto, comma, semicolon, tab, pipe or a single character.
    #[arg(long)]
    pub delimiter: Option<String>,
    #[arg(long)]
    pub start_col: Option<String>,
    #[arg(long)]
    pub end_col: Option<String>,
    #[arg(long)]
    pub text_col: Option<String>,
    #[arg(long)]
    pub schema_version: Option<String>,
    #[arg(long)]
    pub no_merge_subtitles: bool,
    #[arg(long)]
    pub no_merge_disclaimer: bool,
    #[arg(long)]
    pub no_merge_disclaimer_02: bool,
    #[arg(long)]
    pub cast_metadata: bool,
    #[arg(long)]
    pub join_claim: bool,
    #[arg(long)]
    pub no_prefer_local: bool,
    #[arg(long)]
    pub test_mode: bool,
    #[arg(long)]
    pub claims_as_objects: bool,
    #[arg(long)]
    pub no_orientation: bool,
    #[arg(long)]
    pub country_variant_index: Option<usize>,
    #[arg(long)]
    pub no_logo_anim_overview: bool,
}

impl ConversionFlags {
    pub fn resolve(&self) -> Result<ConvertOptions, String> {
        let mut options = match &self.config {
            Some(path) => {
                let src = fs::read_to_string(path)
                    .map_err(|err| format!("read config {}: {err}", path.display()))?;
                ConvertOptions::from_toml(&src)?
            }
            None => ConvertOptions::default(),
        };

        if let Some(fps) = self.fps {
            if fps <= 0.0 {
                return Err(format!("--fps must be positive, got {fps}"));
            }
            options.fps = fps;
        }
        if let Some(start_line) = self.start_line {
            options.start_line_index = start_line;
        }
        if self.times_as_string {
            options.times_as_string = true;
        }
        if let Some(round) = self.round {
            options.set_round(round);
        }
        if self.no_strip_text {
            options.strip_text = false;
        }
        if self.keep_empty_text {
            options.skip_empty_text = false;
        }
        override_with(&mut options.encoding, &self.encoding);
        override_with(&mut options.delimiter, &self.delimiter);
        override_with(&mut options.schema_version, &self.schema_version);
        if self.start_col.is_some() {
            options.start_col = self.start_col.clone();
        }
        if self.end_col.is_some() {
            options.end_col = self.end_col.clone();
        }
        if self.text_col.is_some() {
            options.text_col = self.text_col.clone();
        }
        if self.no_merge_subtitles {
            options.merge_subtitles = false;
        }
        if self.no_merge_disclaimer {
            options.merge_disclaimer = false;
        }
        if self.no_merge_disclaimer_02 {
            options.merge_disclaimer_02 = false;
        }
        options.cast_metadata |= self.cast_metadata;
        options.join_claim |= self.join_claim;
        options.test_mode |= self.test_mode;
        options.claims_as_objects |= self.claims_as_objects;
        options.no_orientation |= self.no_orientation;
        if self.no_prefer_local {
            options.prefer_local = false;
        }
        if self.no_logo_anim_overview {
            options.logo_anim_overview = false;
        }
        if self.country_variant_index.is_some() {
            options.country_variant_index = self.country_variant_index;
        }
        Ok(options)
    }
}

fn override_with(slot: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        *slot = value.clone();
    }
}
