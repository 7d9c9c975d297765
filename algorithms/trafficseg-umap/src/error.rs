use thiserror::Error;
use trafficseg_nn::NnError;

pub type Result<T> = std::result::Result<T, UmapError>;

#[derive(Error, Debug)]
pub enum UmapError {
    #[error("n_neighbors must be at least 2")]
    NNeighbors,
    #[error("spread must be positive and finite")]
    Spread,
    #[error("min_dist must lie between 0 and spread")]
    MinDist,
    #[error("n_epochs must be positive")]
    NEpochs,
    #[error("learning rate must be positive and finite")]
    LearningRate,
    #[error("repulsion strength must be non-negative")]
    RepulsionStrength,
    #[error("nearest neighbour search failed: {0}")]
    NnError(#[from] NnError),
    #[error(transparent)]
    BaseCrate(#[from] trafficseg::Error),
}

impl From<UmapError> for trafficseg::Error {
    fn from(err: UmapError) -> Self {
        match err {
            UmapError::BaseCrate(err) => err,
            UmapError::NnError(err) => err.into(),
            err => trafficseg::Error::Parameters(err.to_string()),
        }
    }
}
