//! Error type for contract violations at the library boundary.
//!
//! Geometry outcomes ("no fix yet", "no qualifying candidate") are never
//! errors; they travel as `Option`/empty results. Only malformed input from
//! the ingestion layer surfaces here.

use thiserror::Error;

/// Library error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown panorama `{0}`")]
    UnknownPanorama(String),

    #[error("unknown detection `{0}`")]
    UnknownDetection(String),

    #[error("unknown object `{0}`")]
    UnknownObject(String),

    #[error("invalid panorama `{id}`: {reason}")]
    InvalidPanorama { id: String, reason: String },

    #[error("detection `{detection_id}` is already assigned to object `{object_id}`")]
    DetectionAlreadyAssigned {
        detection_id: String,
        object_id: String,
    },

    #[error("object `{object_id}` already holds an observation from panorama `{pano_id}`")]
    DuplicatePanorama { object_id: String, pano_id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
