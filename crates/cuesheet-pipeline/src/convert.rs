use crate::aggregate::Aggregator;
use crate::assemble::assemble;
use crate::columns::ColumnLayout;
use crate::config::ConvertOptions;
use crate::document::{ConversionOutput, MultiCountryDocument, SimpleDocument};
use crate::error::ConvertError;
use crate::record::RowClassifier;
use crate::sectioned::{convert_sectioned, is_simple_layout};
use crate::simple::convert_simple;
use crate::table::Table;

/// Converts an already-read table.
///
/// Tables with a `record_type` column use the unified layout. Others read as a plain
/// start/end/text list, or as a sectioned export when [`is_simple_layout`] says no.
pub fn convert_table(table: &Table, options: &ConvertOptions) -> Result<ConversionOutput, ConvertError> {
    if table.rows.is_empty() {
        return Ok(ConversionOutput::Simple(SimpleDocument::default()));
    }
    let Some(layout) = ColumnLayout::detect(&table.headers, options.variant_index()) else {
        if is_simple_layout(&table.headers, options) {
            return convert_simple(table, options).map(ConversionOutput::Simple);
        }
        return convert_sectioned(table, options).map(ConversionOutput::Sectioned);
    };

    let classifier = RowClassifier::new(&layout, &table.headers, options.fps);
    let mut aggregator = Aggregator::new(layout.country_codes(), options);
    for (idx, cells) in table.rows.iter().enumerate() {
        if let Some(row) = classifier.classify(cells, idx + 1)? {
            aggregator.push(row);
        }
    }
    let aggregated = aggregator.finish();
    tracing::debug!(
        countries = ?aggregated.countries,
        videos = aggregated.videos.len(),
        "aggregated rows"
    );

    let by_country = assemble(&aggregated, options);
    Ok(ConversionOutput::Unified(MultiCountryDocument {
        multi: true,
        countries: aggregated.countries.clone(),
        by_country,
        variant_counts: layout
            .countries
            .iter()
            .map(|country| (country.code.clone(), country.variant_count()))
            .collect(),
    }))
}

pub fn convert_bytes(bytes: &[u8], options: &ConvertOptions) -> Result<ConversionOutput, ConvertError> {
    let table = Table::parse(bytes, &options.encoding, &options.delimiter)?;
    convert_table(&table, options)
}
