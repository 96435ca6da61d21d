// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Optics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Reference lattice and linear-optics engine for space-charge preparation.

pub mod lattice;
pub mod session;
pub mod twiss;
