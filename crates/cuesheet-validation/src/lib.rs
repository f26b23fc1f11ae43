use cuesheet_pipeline::{ConversionOutput, CountryPayload, SectionedOutput, SectionedPayload};
use serde::Serialize;
use std::path::Path;

pub mod checks;
pub use checks::{
    parse_required_keys, validate_payload, validate_sectioned, validate_simple, PayloadIssues, ValidationOptions,
    DEFAULT_REQUIRED_GLOBAL_KEYS,
};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReportMode {
    ValidateOnly,
    DryRun,
}

impl ReportMode {
    pub fn completion_message(self) -> &'static str {
        match self {
            ReportMode::ValidateOnly => "Validation complete (no files written).",
            ReportMode::DryRun => "Dry run complete (no files written).",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ValidationReport {
    Unified(UnifiedReport),
    Legacy(LegacyReport),
}

#[derive(Debug, Serialize)]
pub struct UnifiedReport {
    pub input: String,
    pub mode: ReportMode,
    pub countries: Vec<CountryReport>,
    pub summary: ReportSummary,
}

#[derive(Debug, Serialize)]
pub struct LegacyReport {
    pub input: String,
    pub legacy: bool,
    pub mode: ReportMode,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryReport {
    pub country: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub videos: Vec<VideoSummary>,
    pub claim_lines: usize,
    pub disclaimer_lines: usize,
    #[serde(rename = "disclaimer_02Lines")]
    pub disclaimer_02_lines: usize,
    pub logo_lines: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub video_id: String,
    pub subtitle_count: usize,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub errors: usize,
    pub warnings: usize,
}

impl CountryReport {
    fn new(country: &str, payload: &CountryPayload, issues: PayloadIssues) -> Self {
        CountryReport {
            country: country.to_string(),
            errors: issues.errors,
            warnings: issues.warnings,
            videos: payload
                .videos
                .iter()
                .map(|video| VideoSummary {
                    video_id: video.video_id.clone(),
                    subtitle_count: video.subtitles.len(),
                })
                .collect(),
            claim_lines: payload.claim.landscape().len(),
            disclaimer_lines: payload.disclaimer.landscape().len(),
            disclaimer_02_lines: payload.disclaimer_02.landscape().len(),
            logo_lines: payload.logo.landscape().len(),
        }
    }

    fn sectioned(country: &str, payload: &SectionedPayload, issues: PayloadIssues) -> Self {
        CountryReport {
            country: country.to_string(),
            errors: issues.errors,
            warnings: issues.warnings,
            videos: Vec::new(),
            claim_lines: payload.claim.len(),
            disclaimer_lines: payload.disclaimer.len(),
            disclaimer_02_lines: payload.disclaimer_02.len(),
            logo_lines: 0,
        }
    }

    pub fn subtitle_lines(&self) -> usize {
        self.videos.iter().map(|video| video.subtitle_count).sum()
    }
}

pub fn build_report(
    input: &Path,
    mode: ReportMode,
    output: &ConversionOutput,
    options: &ValidationOptions,
) -> ValidationReport {
    let input = input.display().to_string();
    let countries: Vec<CountryReport> = match output {
        ConversionOutput::Unified(document) => document
            .by_country
            .iter()
            .map(|(code, payload)| CountryReport::new(code, payload, validate_payload(payload, options)))
            .collect(),
        ConversionOutput::Sectioned(SectionedOutput::Multi(document)) => document
            .by_country
            .iter()
            .map(|(code, payload)| CountryReport::sectioned(code, payload, validate_sectioned(payload)))
            .collect(),
        ConversionOutput::Sectioned(SectionedOutput::Single(payload)) => {
            return legacy_report(input, mode, validate_sectioned(payload));
        }
        ConversionOutput::Simple(document) => {
            return legacy_report(input, mode, validate_simple(document));
        }
    };
    let summary = countries.iter().fold(
        ReportSummary {
            errors: 0,
            warnings: 0,
        },
        |acc, country| ReportSummary {
            errors: acc.errors + country.errors.len(),
            warnings: acc.warnings + country.warnings.len(),
        },
    );
    ValidationReport::Unified(UnifiedReport {
        input,
        mode,
        countries,
        summary,
    })
}

fn legacy_report(input: String, mode: ReportMode, issues: PayloadIssues) -> ValidationReport {
    ValidationReport::Legacy(LegacyReport {
        input,
        legacy: true,
        mode,
        errors: issues.errors,
        warnings: issues.warnings,
    })
}

impl ValidationReport {
    pub fn mode(&self) -> ReportMode {
        match self {
            ValidationReport::Unified(report) => report.mode,
            ValidationReport::Legacy(report) => report.mode,
        }
    }

    /// Issues prefixed with their country code.
    pub fn errors(&self) -> Vec<String> {
        match self {
            ValidationReport::Unified(report) => report
                .countries
                .iter()
                .flat_map(|country| {
                    country
                        .errors
                        .iter()
                        .map(move |err| format!("{}: {err}", country.country))
                })
                .collect(),
            ValidationReport::Legacy(report) => report.errors.clone(),
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        match self {
            ValidationReport::Unified(report) => report
                .countries
                .iter()
                .flat_map(|country| {
                    country
                        .warnings
                        .iter()
                        .map(move |warning| format!("{}: {warning}", country.country))
                })
                .collect(),
            ValidationReport::Legacy(report) => report.warnings.clone(),
        }
    }

    pub fn has_errors(&self) -> bool {
        match self {
            ValidationReport::Unified(report) => report.summary.errors > 0,
            ValidationReport::Legacy(report) => !report.errors.is_empty(),
        }
    }
}

pub fn write_report(path: &Path, report: &ValidationReport) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("create report dir {}: {err}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).map_err(|err| err.to_string())?;
    std::fs::write(path, json).map_err(|err| format!("write report {}: {err}", path.display()))?;
    Ok(())
}

pub fn render_text_report(report: &ValidationReport) -> String {
    let mut out = String::new();
    if let ValidationReport::Unified(unified) = report {
        let codes: Vec<&str> = unified
            .countries
            .iter()
            .map(|country| country.country.as_str())
            .collect();
        out.push_str(&format!(
            "Discovered countries ({}): {:?}\n",
            codes.len(),
            codes
        ));
        for country in &unified.countries {
            out.push_str(&format!(
                "  {}: videos={} subtitleLines={} claimLines={} disclaimerLines={} disclaimer_02Lines={} logoLines={}\n",
                country.country,
                country.videos.len(),
                country.subtitle_lines(),
                country.claim_lines,
                country.disclaimer_lines,
                country.disclaimer_02_lines,
                country.logo_lines
            ));
        }
    }

    let warnings = report.warnings();
    if !warnings.is_empty() {
        out.push_str("Validation warnings:\n");
        for warning in &warnings {
            out.push_str(&format!("  - {warning}\n"));
        }
    }
    let errors = report.errors();
    if !errors.is_empty() {
        out.push_str("Validation errors:\n");
        for err in &errors {
            out.push_str(&format!("  - {err}\n"));
        }
    }

    out.push_str(report.mode().completion_message());
    if report.mode() == ReportMode::ValidateOnly {
        let verdict = if !errors.is_empty() {
            " Errors found."
        } else if !warnings.is_empty() {
            " OK (warnings only)."
        } else {
            " OK."
        };
        out.push_str(verdict);
    }
    out.push('\n');
    out
}
