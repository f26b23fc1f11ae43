use cuesheet_timing::TimecodeError;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(String),
    #[error("encoding error: {0}")]
    Encoding(String),
    #[error("CSV appears to be empty")]
    EmptyInput,
    #[error("missing required column(s): {missing}; found headers: {headers:?}")]
    MissingColumns {
        missing: String,
        headers: Vec<String>,
    },
    #[error("column override error: {0}")]
    ColumnOverride(String),
    #[error("row {row}, column '{column}': invalid timecode '{value}': {source}")]
    Timecode {
        row: usize,
        column: String,
        value: String,
        #[source]
        source: TimecodeError,
    },
    #[error("config error: {0}")]
    Config(String),
    #[error("output error: {0}")]
    Output(String),
}

impl From<csv::Error> for ConvertError {
    fn from(err: csv::Error) -> Self {
        ConvertError::Csv(err.to_string())
    }
}
