// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Errors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpaceChargeError {
    #[error("Invalid input shape: {0}")]
    InputShape(String),

    #[error("Count mismatch: kicks={kicks}, lengths={lengths}, optics={optics}")]
    CountMismatch {
        kicks: usize,
        lengths: usize,
        optics: usize,
    },

    #[error("Kick/optics correlation broken at index {index}: kick '{kick}' vs optics '{optics}'")]
    Correlation {
        index: usize,
        kick: String,
        optics: String,
    },

    #[error("Kick/plan mismatch at index {index}: kick '{kick}' vs planned slot '{slot}'")]
    PlanMismatch {
        index: usize,
        kick: String,
        slot: String,
    },

    #[error("Optics engine error: {0}")]
    ExternalEngine(String),

    #[error("Element not found in line: {0}")]
    MissingElement(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SpaceChargeResult<T> = Result<T, SpaceChargeError>;
