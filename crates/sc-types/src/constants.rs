// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Proton rest energy (eV), CODATA 2018.
pub const PROTON_MASS_EV: f64 = 938.272_088_16e6;

/// Slot id tagging coasting-beam kick placeholders.
pub const SLOT_ID_COASTING: u32 = 1;

/// Slot id tagging bunched-beam kick placeholders.
pub const SLOT_ID_BUNCHED: u32 = 2;

/// Name prefix of the generated kick elements (`sc0`, `sc1`, ...).
pub const KICK_NAME_PREFIX: &str = "sc";

/// Relative tolerance when checking that kick lengths partition the path.
pub const PARTITION_REL_TOLERANCE: f64 = 1e-9;
