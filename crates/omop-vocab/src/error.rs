use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VocabError {
    #[error("failed to read concept table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse concept table {origin}: {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported concept table schema {schema} v{version}")]
    UnsupportedSchema { schema: String, version: u32 },

    #[error("{domain}: code '{code}' is not an integer")]
    InvalidCode { domain: String, code: String },

    #[error("{domain}.{key}: negative concept id {id}")]
    NegativeConcept { domain: String, key: String, id: i64 },

    #[error("{entry}: unknown unit '{unit}'")]
    UnknownUnit { entry: String, unit: String },

    #[error("{entry}: unknown unit code set '{set}'")]
    UnknownUnitCodes { entry: String, set: String },

    #[error("{entry}: no conversion from {from} to {to}")]
    UnsupportedConversion {
        entry: String,
        from: String,
        to: String,
    },

    #[error("{entry}: range_low {low} exceeds range_high {high}")]
    InvalidRange { entry: String, low: f64, high: f64 },
}

impl VocabError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
