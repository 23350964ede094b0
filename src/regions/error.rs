use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionError {
    /// A level-1..3 region shipped WKT that does not parse; the whole load
    /// fails rather than indexing a partial hierarchy.
    #[error("malformed geometry for region '{key}': {detail}")]
    InvalidGeometry { key: String, detail: String },
}
