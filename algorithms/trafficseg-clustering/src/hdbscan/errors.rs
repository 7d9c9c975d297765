use thiserror::Error;

/// An error when checking the HDBSCAN hyperparameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HdbscanParamsError {
    #[error("min_cluster_size must be at least 2")]
    MinClusterSize,
    #[error("min_samples cannot be 0")]
    MinSamples,
}

/// An error when clustering with HDBSCAN
#[derive(Error, Debug)]
pub enum HdbscanError {
    /// When any of the hyperparameters are set the wrong value
    #[error("Invalid hyperparameter: {0}")]
    InvalidParams(#[from] HdbscanParamsError),
    #[error(transparent)]
    BaseCrate(#[from] trafficseg::Error),
}

impl From<HdbscanError> for trafficseg::Error {
    fn from(err: HdbscanError) -> Self {
        match err {
            HdbscanError::InvalidParams(err) => trafficseg::Error::Parameters(err.to_string()),
            HdbscanError::BaseCrate(err) => err,
        }
    }
}
