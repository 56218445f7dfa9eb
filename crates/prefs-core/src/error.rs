use prefs_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrefError {
    /// A value outside the supported variants was handed to the write path.
    #[error("unsupported value type for key {key}: {source}")]
    UnsupportedValueType {
        key: String,
        #[source]
        source: TypeError,
    },

    #[error("store error: {0}")]
    Store(#[from] prefs_store::StoreError),
}

pub type PrefResult<T> = Result<T, PrefError>;
