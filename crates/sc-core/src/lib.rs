// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Space-charge kick preparation.
//!
//! Planning and parameterization are pure; installation and optics go
//! through the [`engine::OpticsEngine`] seam.

pub mod engine;
pub mod installer;
pub mod line;
pub mod parameterizer;
pub mod pipeline;
pub mod planner;
