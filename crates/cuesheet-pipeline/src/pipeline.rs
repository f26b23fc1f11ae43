use crate::config::ConvertOptions;
use crate::convert::convert_table;
use crate::document::ConversionOutput;
use crate::error::ConvertError;
use crate::output::{route_output, sha256_bytes, GenerationMetadata, OutputOptions};
use crate::table::{read_table, Table};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input_path: PathBuf,
    pub convert: ConvertOptions,
    pub output: OutputOptions,
    pub generation_meta: bool,
    pub converter_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub input_path: PathBuf,
    pub input_sha256: String,
    pub countries: Vec<String>,
    pub files_written: Vec<PathBuf>,
}

pub fn run_pipeline(options: PipelineOptions) -> Result<PipelineReport, ConvertError> {
    let input_path = absolute_path(&options.input_path)?;
    let bytes = fs::read(&input_path)?;
    let input_sha256 = sha256_bytes(&bytes);
    let table = Table::parse(&bytes, &options.convert.encoding, &options.convert.delimiter)?;
    tracing::debug!(
        path = %input_path.display(),
        rows = table.rows.len(),
        delimiter = %char::from(table.delimiter),
        "read input table"
    );

    let generation = options
        .generation_meta
        .then(|| GenerationMetadata::collect(&input_path, &bytes, options.converter_version.as_deref()));

    let mut output = convert_table(&table, &options.convert)?;
    if let Some(generation) = &generation {
        generation.apply_all(&mut output);
    }

    let reconvert = |variant_index: usize| -> Result<ConversionOutput, ConvertError> {
        let mut convert = options.convert.clone();
        convert.country_variant_index = Some(variant_index);
        let mut alternate = convert_table(&table, &convert)?;
        if let Some(generation) = &generation {
            generation.apply_all(&mut alternate);
        }
        Ok(alternate)
    };
    let files_written = route_output(&output, &input_path, &options.output, reconvert)?;

    Ok(PipelineReport {
        input_path,
        input_sha256,
        countries: output.countries().to_vec(),
        files_written,
    })
}

/// Reads and converts a file without writing anything.
pub fn load_conversion(path: &Path, options: &ConvertOptions) -> Result<ConversionOutput, ConvertError> {
    let table = read_table(path, &options.encoding, &options.delimiter)?;
    convert_table(&table, options)
}

pub fn absolute_path(path: &Path) -> Result<PathBuf, ConvertError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
