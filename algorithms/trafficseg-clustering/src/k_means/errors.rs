use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KMeansParamsError {
    #[error("k-means needs at least one cluster")]
    NClusters,
    #[error("k-means needs at least one run")]
    NRuns,
    #[error("k-means tolerance must be a positive number")]
    Tolerance,
    #[error("k-means needs at least one iteration per run")]
    MaxIterations,
}

#[derive(Error, Debug)]
pub enum KMeansError {
    #[error(transparent)]
    Params(#[from] KMeansParamsError),
    /// Every run ended with an infinite or undefined inertia
    #[error("no k-means run reached a finite inertia")]
    NonFiniteInertia,
    #[error(transparent)]
    BaseCrate(#[from] trafficseg::Error),
}

impl From<KMeansError> for trafficseg::Error {
    fn from(err: KMeansError) -> Self {
        match err {
            KMeansError::Params(err) => trafficseg::Error::Parameters(err.to_string()),
            KMeansError::NonFiniteInertia => trafficseg::Error::Algorithm(err.to_string()),
            KMeansError::BaseCrate(err) => err,
        }
    }
}
