use thiserror::Error;

/// Why a height-zone table was rejected.
///
/// Rows are 1-based and counted from the lowest floor, matching the floor
/// numbers shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZoneError {
    #[error("Invalid height zone number {zone} at row {row} (expected 1 to {floors})")]
    OutOfRange { row: usize, zone: i64, floors: usize },

    #[error("Height zone numbers must be non-descending. Error at row {row}")]
    Descending { row: usize, zone: i64, previous: i64 },
}

/// A rejected page form. The message is what the user sees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("{0}")]
    Invalid(&'static str),

    #[error("Please enter valid height zone data.")]
    HeightZones(#[from] ZoneError),
}

impl FormError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential store is corrupted: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("no {0} has been stored")]
    Missing(&'static str),

    #[error("keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("unknown credential account {0}")]
    UnknownAccount(String),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("save data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot could not be encoded: {0}")]
    Snapshot(#[from] bincode::Error),
}

#[cfg(feature = "web")]
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error! Status: {status} ({endpoint})")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("unexpected response from {endpoint}: {detail}")]
    Decode { endpoint: String, detail: String },
}
