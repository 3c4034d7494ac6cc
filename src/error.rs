use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Projection error: {0}")]
    ProjectionError(String),
    #[error("Routing error: {0}")]
    RoutingError(String),
    #[error("Not enough terminal points: got {0}, need at least 3")]
    InsufficientPoints(usize),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("No population field found among layer attributes")]
    FieldNotFound,
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}
