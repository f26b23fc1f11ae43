use crate::document::{ConversionOutput, CountryPayload};
use crate::error::ConvertError;
use crate::sectioned::{SectionedOutput, SectionedPayload};
use crate::value::MetaValue;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const COUNTRY_PLACEHOLDER: &str = "{country}";
pub const CONVERTER_VERSION_ENV: &str = "CONVERTER_VERSION";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub output: Option<PathBuf>,
    pub output_pattern: Option<String>,
    pub split_by_country: bool,
    /// 1-based position in the discovered country list.
    pub country_column: Option<usize>,
    pub auto_output: bool,
    pub output_dir: Option<PathBuf>,
    pub sample: bool,
}

impl OutputOptions {
    fn is_templated(&self) -> bool {
        self.split_by_country
            || self.output_pattern.is_some()
            || self.country_column.is_some()
            || self
                .output
                .as_ref()
                .is_some_and(|path| path.to_string_lossy().contains(COUNTRY_PLACEHOLDER))
    }

    /// Output path (possibly containing `{country}`) for a given input file.
    pub fn resolve_path(&self, input_path: &Path) -> Result<String, ConvertError> {
        if self.auto_output {
            let stem = input_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            let dir = match &self.output_dir {
                Some(dir) => dir.clone(),
                None => input_path
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            };
            let name = if self.is_templated() {
                format!("{stem}_{COUNTRY_PLACEHOLDER}.json")
            } else {
                format!("{stem}.json")
            };
            return Ok(dir.join(name).to_string_lossy().into_owned());
        }
        self.output
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ConvertError::Output("no output path given (pass an output path or use auto output)".to_string())
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationMetadata {
    pub generated_at: String,
    pub input_sha256: String,
    pub input_file_name: String,
    pub converter_version: String,
}

impl GenerationMetadata {
    pub fn collect(input_path: &Path, input_bytes: &[u8], converter_version: Option<&str>) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            input_sha256: sha256_bytes(input_bytes),
            input_file_name: input_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            converter_version: resolve_converter_version(converter_version),
        }
    }

    pub fn apply(&self, metadata: &mut BTreeMap<String, MetaValue>) {
        metadata.insert("generatedAt".to_string(), MetaValue::text(self.generated_at.as_str()));
        metadata.insert("inputSha256".to_string(), MetaValue::text(self.input_sha256.as_str()));
        metadata
            .entry("inputFileName".to_string())
            .or_insert_with(|| MetaValue::text(self.input_file_name.as_str()));
        metadata.insert(
            "converterVersion".to_string(),
            MetaValue::text(self.converter_version.as_str()),
        );
    }

    /// Stamps every payload that carries a metadata object. Plain subtitle lists have none.
    pub fn apply_all(&self, output: &mut ConversionOutput) {
        match output {
            ConversionOutput::Unified(document) => {
                for (_, payload) in &mut document.by_country {
                    self.apply(&mut payload.metadata_global);
                }
            }
            ConversionOutput::Sectioned(SectionedOutput::Single(payload)) => self.apply(&mut payload.metadata),
            ConversionOutput::Sectioned(SectionedOutput::Multi(document)) => {
                for (_, payload) in &mut document.by_country {
                    self.apply(&mut payload.metadata);
                }
            }
            ConversionOutput::Simple(_) => {}
        }
    }
}

pub fn resolve_converter_version(explicit: Option<&str>) -> String {
    if let Some(version) = explicit.map(str::trim).filter(|version| !version.is_empty()) {
        return version.to_string();
    }
    match std::env::var(CONVERTER_VERSION_ENV) {
        Ok(version) if !version.trim().is_empty() => version.trim().to_string(),
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    format!("{:x}", digest)
}

fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind(['/', '\\']).map_or(0, |idx| idx + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => path.split_at(name_start + dot),
        _ => (path, ""),
    }
}

pub fn ensure_country_placeholder(pattern: &str) -> String {
    if pattern.contains(COUNTRY_PLACEHOLDER) {
        return pattern.to_string();
    }
    let (root, ext) = split_extension(pattern);
    format!("{root}_{COUNTRY_PLACEHOLDER}{ext}")
}

pub fn sample_path(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    let (root, ext) = split_extension(&text);
    let ext = if ext.is_empty() { ".json" } else { ext };
    PathBuf::from(format!("{root}_sample{ext}"))
}

/// `<code>_<language>` when the payload carries a language, else the code.
pub fn country_token(code: &str, payload: &CountryPayload) -> String {
    match payload.language() {
        Some(language) => format!("{code}_{}", language.trim()),
        None => code.to_string(),
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConvertError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| ConvertError::Output(format!("serialize {}: {err}", path.display())))?;
    fs::write(path, json)?;
    tracing::info!(path = %path.display(), "wrote json");
    Ok(())
}

/// Per-country payload shapes the router writes one file for.
trait CountryOutput: Serialize + Clone {
    fn token(&self, code: &str) -> String;
    fn sample(&self) -> Self;
    fn localize(&mut self, _code: &str) {}
}

impl CountryOutput for CountryPayload {
    fn token(&self, code: &str) -> String {
        country_token(code, self)
    }

    fn sample(&self) -> Self {
        CountryPayload::sample(self)
    }

    fn localize(&mut self, code: &str) {
        self.trim_logo_anim_overview(code);
    }
}

impl CountryOutput for SectionedPayload {
    fn token(&self, code: &str) -> String {
        code.to_string()
    }

    fn sample(&self) -> Self {
        SectionedPayload::sample(self)
    }
}

struct Writer<'a> {
    options: &'a OutputOptions,
    written: Vec<PathBuf>,
}

impl Writer<'_> {
    fn write<T: Serialize>(&mut self, path: PathBuf, value: &T, sample: impl FnOnce() -> T) -> Result<(), ConvertError> {
        write_json(&path, value)?;
        let sample_file = sample_path(&path);
        self.written.push(path);
        if self.options.sample {
            write_json(&sample_file, &sample())?;
            self.written.push(sample_file);
        }
        Ok(())
    }

    fn write_country<T: CountryOutput>(
        &mut self,
        pattern: &str,
        code: &str,
        payload: &T,
        suffix: &str,
    ) -> Result<(), ConvertError> {
        let mut payload = payload.clone();
        payload.localize(code);
        let token = format!("{}{suffix}", payload.token(code));
        let path = PathBuf::from(pattern.replace(COUNTRY_PLACEHOLDER, &token));
        self.write(path, &payload, || payload.sample())
    }

    /// Single-file mode: the chosen `country_column`, else the last country.
    fn write_selected<T: CountryOutput>(
        &mut self,
        base: String,
        by_country: &[(String, T)],
    ) -> Result<(), ConvertError> {
        let options = self.options;
        let selected = options
            .country_column
            .and_then(|column| column.checked_sub(1))
            .and_then(|idx| by_country.get(idx))
            .or_else(|| by_country.last());
        let Some((code, payload)) = selected else {
            return Err(ConvertError::Output("no country columns found in input".to_string()));
        };
        if let Some(column) = options.country_column {
            if column == 0 || column > by_country.len() {
                tracing::warn!(column, selected = %code, "country column out of range; using last country");
            }
        }
        let pattern = if base.contains(COUNTRY_PLACEHOLDER) {
            base
        } else if let Some(pattern) = &options.output_pattern {
            ensure_country_placeholder(pattern)
        } else {
            base
        };
        self.write_country(&pattern, code, payload, "")
    }
}

/// Writes the conversion result according to the output options.
///
/// `variant` re-runs the conversion for an alternate variant pair index; it is
/// only called when splitting and a country has more than one pair.
pub fn route_output<F>(
    output: &ConversionOutput,
    input_path: &Path,
    options: &OutputOptions,
    mut variant: F,
) -> Result<Vec<PathBuf>, ConvertError>
where
    F: FnMut(usize) -> Result<ConversionOutput, ConvertError>,
{
    let base = options.resolve_path(input_path)?;
    let mut writer = Writer {
        options,
        written: Vec::new(),
    };
    let split_pattern = || ensure_country_placeholder(options.output_pattern.as_deref().unwrap_or(&base));

    match output {
        ConversionOutput::Simple(document) => {
            writer.write(PathBuf::from(&base), document, || document.sample())?;
        }
        ConversionOutput::Sectioned(SectionedOutput::Single(payload)) => {
            writer.write(PathBuf::from(&base), payload, || payload.sample())?;
        }
        ConversionOutput::Sectioned(SectionedOutput::Multi(document)) if options.split_by_country => {
            let pattern = split_pattern();
            for (code, payload) in &document.by_country {
                writer.write_country(&pattern, code, payload, "")?;
            }
        }
        ConversionOutput::Sectioned(SectionedOutput::Multi(document)) => {
            writer.write_selected(base.clone(), &document.by_country)?;
        }
        ConversionOutput::Unified(document) if options.split_by_country => {
            let pattern = split_pattern();
            for (code, payload) in &document.by_country {
                writer.write_country(&pattern, code, payload, "")?;

                for variant_index in 1..document.variant_count(code) {
                    let alternate = match variant(variant_index)? {
                        ConversionOutput::Unified(alternate) => alternate,
                        _ => continue,
                    };
                    let Some(payload) = alternate.payload(code) else {
                        tracing::warn!(country = %code, variant = variant_index, "variant conversion lost country");
                        continue;
                    };
                    writer.write_country(&pattern, code, payload, &format!("_v{variant_index}"))?;
                }
            }
        }
        ConversionOutput::Unified(document) => {
            writer.write_selected(base.clone(), &document.by_country)?;
        }
    }
    Ok(writer.written)
}
