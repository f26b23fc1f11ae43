#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub const BOTH: [Orientation; 2] = [Orientation::Landscape, Orientation::Portrait];

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryColumns {
    pub code: String,
    pub landscape: usize,
    pub portrait: Option<usize>,
    pub occurrences: Vec<usize>,
}

impl CountryColumns {
    pub fn variant_count(&self) -> usize {
        ((self.occurrences.len() + 1) / 2).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub record_type: usize,
    pub video_id: Option<usize>,
    pub line: Option<usize>,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub key: Option<usize>,
    pub country_scope: Option<usize>,
    pub metadata: Option<usize>,
    pub countries: Vec<CountryColumns>,
}

fn find_column(lowered: &[String], name: &str) -> Option<usize> {
    lowered.iter().position(|header| header == name)
}

impl ColumnLayout {
    /// Returns `None` when the header has no `record_type` column.
    pub fn detect(headers: &[String], variant_index: usize) -> Option<Self> {
        let lowered: Vec<String> = headers
            .iter()
            .map(|header| header.trim().to_lowercase())
            .collect();
        let record_type = find_column(&lowered, "record_type")?;
        let end = find_column(&lowered, "end");
        let key = find_column(&lowered, "key");
        let country_scope = find_column(&lowered, "country_scope");
        let metadata = find_column(&lowered, "metadata");

        let first_country = match (metadata, country_scope) {
            (Some(idx), _) => idx + 1,
            (None, Some(idx)) => idx + 1,
            (None, None) => end.unwrap_or(0).max(key.unwrap_or(0)) + 1,
        };

        let mut occurrences: Vec<(String, Vec<usize>)> = Vec::new();
        for (idx, header) in headers.iter().enumerate().skip(first_country) {
            let code = header.trim();
            if code.is_empty() {
                continue;
            }
            match occurrences.iter_mut().find(|(seen, _)| seen == code) {
                Some((_, positions)) => positions.push(idx),
                None => occurrences.push((code.to_string(), vec![idx])),
            }
        }

        let countries = occurrences
            .into_iter()
            .map(|(code, positions)| select_variant(code, positions, variant_index))
            .collect::<Vec<_>>();
        for country in &countries {
            tracing::debug!(
                country = %country.code,
                landscape = country.landscape,
                portrait = ?country.portrait,
                variants = country.variant_count(),
                "country columns"
            );
        }

        Some(ColumnLayout {
            record_type,
            video_id: find_column(&lowered, "video_id"),
            line: find_column(&lowered, "line"),
            start: find_column(&lowered, "start"),
            end,
            key,
            country_scope,
            metadata,
            countries,
        })
    }

    pub fn country_codes(&self) -> Vec<String> {
        self.countries.iter().map(|country| country.code.clone()).collect()
    }
}

// Pair `vi` uses occurrences 2*vi and 2*vi+1, falling back to the first pair.
fn select_variant(code: String, occurrences: Vec<usize>, variant_index: usize) -> CountryColumns {
    let landscape = occurrences
        .get(2 * variant_index)
        .or_else(|| occurrences.first())
        .copied()
        .unwrap_or_default();
    let portrait = occurrences
        .get(2 * variant_index + 1)
        .or_else(|| occurrences.get(1))
        .copied();
    CountryColumns {
        code,
        landscape,
        portrait,
        occurrences,
    }
}
