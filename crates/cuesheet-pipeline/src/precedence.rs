use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet};

pub const COUNTRY_FLAG_KEYS: [&str; 5] = [
    "disclaimer_flag",
    "disclaimer_02_flag",
    "subtitle_flag",
    "super_A_flag",
    "super_B_flag",
];
pub const LOGO_ANIM_FLAG: &str = "logo_anim_flag";
pub const DEFAULT_KEY: &str = "_default";

pub fn country_flag_key(key: &str) -> Option<&'static str> {
    COUNTRY_FLAG_KEYS
        .iter()
        .copied()
        .find(|flag| flag.eq_ignore_ascii_case(key.trim()))
}

pub fn is_logo_anim_flag(key: &str) -> bool {
    key.trim().eq_ignore_ascii_case(LOGO_ANIM_FLAG)
}

/// The three levels a flag can be set at, highest priority first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Precedence<'a> {
    pub video: Option<&'a str>,
    pub country: Option<&'a str>,
    pub fallback: Option<&'a str>,
}

impl<'a> Precedence<'a> {
    pub fn resolve(self) -> Option<&'a str> {
        self.video.or(self.country).or(self.fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Scalar(String),
    PerCountry {
        default: String,
        overrides: BTreeMap<String, String>,
    },
}

impl FlagValue {
    pub fn resolve(&self, country: &str) -> &str {
        match self {
            FlagValue::Scalar(value) => value,
            FlagValue::PerCountry { default, overrides } => {
                overrides.get(country).unwrap_or(default)
            }
        }
    }
}

impl Serialize for FlagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FlagValue::Scalar(value) => serializer.serialize_str(value),
            FlagValue::PerCountry { default, overrides } => {
                let mut map = serializer.serialize_map(Some(overrides.len() + 1))?;
                map.serialize_entry(DEFAULT_KEY, default)?;
                for (country, value) in overrides {
                    map.serialize_entry(country, value)?;
                }
                map.end()
            }
        }
    }
}

/// Duration -> flag value, in (length, lexical) duration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoAnimOverview {
    pub entries: Vec<(String, FlagValue)>,
}

impl LogoAnimOverview {
    pub fn get(&self, duration: &str) -> Option<&FlagValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == duration)
            .map(|(_, value)| value)
    }

    /// Collapses nested entries to the value seen by one country.
    pub fn for_country(&self, country: &str) -> LogoAnimOverview {
        LogoAnimOverview {
            entries: self
                .entries
                .iter()
                .map(|(duration, value)| {
                    (duration.clone(), FlagValue::Scalar(value.resolve(country).to_string()))
                })
                .collect(),
        }
    }
}

impl Serialize for LogoAnimOverview {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (duration, value) in &self.entries {
            map.serialize_entry(duration, value)?;
        }
        map.end()
    }
}

/// `logo_anim_flag` values from `meta_global` rows, keyed by duration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoAnimTable {
    defaults: BTreeMap<String, String>,
    per_country: BTreeMap<String, BTreeMap<String, String>>,
    /// First country that recorded a value for each duration.
    first_country: BTreeMap<String, String>,
}

impl LogoAnimTable {
    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }

    /// Country values fall back to `default`; an empty default takes the value of the
    /// first country ever recorded for the duration.
    pub fn record<'a>(
        &mut self,
        duration: &str,
        default: &str,
        values: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        let duration = duration.trim();
        if duration.is_empty() {
            return;
        }
        let mut default = default.to_string();
        let bucket = self.per_country.entry(duration.to_string()).or_default();
        for (country, value) in values {
            let value = if value.is_empty() { default.as_str() } else { value };
            if !value.is_empty() {
                self.first_country
                    .entry(duration.to_string())
                    .or_insert_with(|| country.to_string());
                bucket.insert(country.to_string(), value.to_string());
            }
        }
        if default.is_empty() {
            if let Some(first) = self
                .first_country
                .get(duration)
                .and_then(|country| bucket.get(country))
            {
                default = first.clone();
            }
        }
        if bucket.is_empty() {
            self.per_country.remove(duration);
        }
        if !default.is_empty() {
            self.defaults.insert(duration.to_string(), default);
        }
    }

    pub fn resolve<'a>(
        &'a self,
        duration: &str,
        country: &str,
        video: Option<&'a str>,
    ) -> Option<&'a str> {
        let duration = duration.trim().to_uppercase();
        let fallback = self.defaults.get(&duration).map(String::as_str);
        let country_value = fallback.and_then(|_| {
            self.per_country
                .get(&duration)
                .and_then(|values| values.get(country))
                .map(String::as_str)
        });
        Precedence {
            video,
            country: country_value,
            fallback,
        }
        .resolve()
    }

    pub fn overview(&self) -> LogoAnimOverview {
        let mut durations: Vec<&String> = self.defaults.keys().collect();
        durations.sort_by(|a, b| a.len().cmp(&b.len()).then(a.cmp(b)));
        let entries = durations
            .into_iter()
            .map(|duration| {
                let default = self.defaults[duration].clone();
                let value = match self.per_country.get(duration) {
                    Some(values) if !values.is_empty() => {
                        let unique: BTreeSet<&String> = values.values().collect();
                        if unique.len() > 1 || !unique.contains(&default) {
                            FlagValue::PerCountry {
                                default,
                                overrides: values.clone(),
                            }
                        } else {
                            FlagValue::Scalar(default)
                        }
                    }
                    _ => FlagValue::Scalar(default),
                };
                (duration.clone(), value)
            })
            .collect();
        LogoAnimOverview { entries }
    }
}

/// Country-scoped flag defaults from `meta_global` rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagDefaults {
    pub by_country: Vec<BTreeMap<String, String>>,
    pub logo_anim: LogoAnimTable,
}

impl FlagDefaults {
    pub fn new(countries: usize) -> Self {
        Self {
            by_country: vec![BTreeMap::new(); countries],
            logo_anim: LogoAnimTable::default(),
        }
    }

    pub fn set(&mut self, country: usize, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        if let Some(flags) = self.by_country.get_mut(country) {
            flags.insert(key.to_string(), value.to_string());
        }
    }

    /// Final flag values for one video in one country.
    pub fn resolve_for_video(
        &self,
        country: usize,
        code: &str,
        duration: Option<&str>,
        overrides: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let empty = BTreeMap::new();
        let country_flags = self.by_country.get(country).unwrap_or(&empty);
        let mut keys: BTreeSet<&str> = country_flags.keys().map(String::as_str).collect();
        keys.extend(overrides.keys().map(String::as_str));

        let mut resolved = BTreeMap::new();
        for key in keys.into_iter().filter(|key| *key != LOGO_ANIM_FLAG) {
            let levels = Precedence {
                video: overrides.get(key).map(String::as_str),
                country: country_flags.get(key).map(String::as_str),
                fallback: None,
            };
            if let Some(value) = levels.resolve() {
                resolved.insert(key.to_string(), value.to_string());
            }
        }

        let local_logo = overrides.get(LOGO_ANIM_FLAG).map(String::as_str);
        let logo = match duration {
            Some(duration) => self.logo_anim.resolve(duration, code, local_logo),
            None => local_logo,
        };
        if let Some(value) = logo {
            resolved.insert(LOGO_ANIM_FLAG.to_string(), value.to_string());
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_prefers_video_then_country_then_fallback() {
        let all = Precedence {
            video: Some("v"),
            country: Some("c"),
            fallback: Some("f"),
        };
        assert_eq!(all.resolve(), Some("v"));
        assert_eq!(Precedence { video: None, ..all }.resolve(), Some("c"));
        assert_eq!(
            Precedence {
                video: None,
                country: None,
                fallback: Some("f")
            }
            .resolve(),
            Some("f")
        );
        assert_eq!(Precedence::default().resolve(), None);
    }

    #[test]
    fn video_override_always_wins() {
        for country in [None, Some("c")] {
            for fallback in [None, Some("f")] {
                let levels = Precedence {
                    video: Some("v"),
                    country,
                    fallback,
                };
                assert_eq!(levels.resolve(), Some("v"));
            }
        }
    }

    #[test]
    fn flag_value_resolves_per_country() {
        let mut overrides = BTreeMap::new();
        overrides.insert("FRA".to_string(), "N".to_string());
        let value = FlagValue::PerCountry {
            default: "Y".to_string(),
            overrides,
        };
        assert_eq!(value.resolve("FRA"), "N");
        assert_eq!(value.resolve("GBL"), "Y");
        assert_eq!(FlagValue::Scalar("Y".to_string()).resolve("FRA"), "Y");
        assert_eq!(
            serde_json::to_value(&value).expect("json"),
            serde_json::json!({"_default": "Y", "FRA": "N"})
        );
    }

    #[test]
    fn logo_table_uses_default_when_countries_agree() {
        let mut table = LogoAnimTable::default();
        table.record("30", "Y", [("GBL", ""), ("FRA", "")]);
        table.record("6", "N", [("GBL", ""), ("FRA", "")]);
        let overview = table.overview();
        assert_eq!(overview.entries[0].0, "6");
        assert_eq!(overview.get("30"), Some(&FlagValue::Scalar("Y".to_string())));
        assert_eq!(table.resolve("30", "FRA", None), Some("Y"));
        assert_eq!(table.resolve("30", "FRA", Some("N")), Some("N"));
        assert_eq!(table.resolve("15", "FRA", None), None);
    }

    #[test]
    fn logo_table_nests_disagreeing_countries() {
        let mut table = LogoAnimTable::default();
        table.record("15", "", [("GBL", "Y"), ("FRA", "N")]);
        let overview = table.overview();
        match overview.get("15").expect("entry") {
            FlagValue::PerCountry { default, overrides } => {
                assert_eq!(default, "Y");
                assert_eq!(overrides.get("FRA").map(String::as_str), Some("N"));
            }
            other => panic!("expected nested value, got {other:?}"),
        }
        let trimmed = overview.for_country("FRA");
        assert_eq!(trimmed.get("15"), Some(&FlagValue::Scalar("N".to_string())));
    }

    #[test]
    fn empty_default_follows_first_recorded_country() {
        let mut table = LogoAnimTable::default();
        table.record("15", "", [("GBL", ""), ("FRA", "N")]);
        table.record("15", "", [("AUS", "Y"), ("FRA", "")]);
        assert_eq!(table.resolve("15", "DEU", None), Some("N"));
        assert_eq!(table.resolve("15", "AUS", None), Some("Y"));

        table.record("30", "", [("ZAF", "Y"), ("AUS", "N")]);
        assert_eq!(table.resolve("30", "DEU", None), Some("Y"));
    }

    #[test]
    fn durations_sort_by_length_then_text() {
        let mut table = LogoAnimTable::default();
        for duration in ["120", "30", "6", "15"] {
            table.record(duration, "Y", []);
        }
        let order: Vec<String> = table
            .overview()
            .entries
            .into_iter()
            .map(|(duration, _)| duration)
            .collect();
        assert_eq!(order, vec!["6", "15", "30", "120"]);
    }

    #[test]
    fn video_flags_layer_overrides_on_country_defaults() {
        let mut defaults = FlagDefaults::new(2);
        defaults.set(0, "subtitle_flag", "Y");
        defaults.set(1, "subtitle_flag", "N");
        defaults.logo_anim.record("30", "Y", [("GBL", ""), ("FRA", "")]);

        let mut overrides = BTreeMap::new();
        overrides.insert("subtitle_flag".to_string(), "L".to_string());
        overrides.insert(LOGO_ANIM_FLAG.to_string(), "N".to_string());

        let gbl = defaults.resolve_for_video(0, "GBL", Some("30"), &BTreeMap::new());
        assert_eq!(gbl.get("subtitle_flag").map(String::as_str), Some("Y"));
        assert_eq!(gbl.get(LOGO_ANIM_FLAG).map(String::as_str), Some("Y"));

        let fra = defaults.resolve_for_video(1, "FRA", Some("30"), &overrides);
        assert_eq!(fra.get("subtitle_flag").map(String::as_str), Some("L"));
        assert_eq!(fra.get(LOGO_ANIM_FLAG).map(String::as_str), Some("N"));
    }
}
