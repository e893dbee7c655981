use thiserror::Error;

/// Clustering errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KMeansErr {
    #[error("There are no present samples to cluster")]
    EmptyDataset,
    #[error("You can't request 0 clusters. Try a positive number")]
    InvalidK,
    #[error("Sample at position {index} is infinite")]
    NonFiniteSample { index: usize },
    #[error("Grid declared as {lat}x{lon}, but {cells} cells were supplied")]
    GridShape { lat: usize, lon: usize, cells: usize },
    #[error("An error occurred during numeric conversion")]
    ConversionError,
}
