// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Placeholder Installer
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Zero-length kick placeholders handed to the optics engine.

use crate::engine::OpticsEngine;
use sc_types::error::SpaceChargeResult;
use sc_types::state::{KickMode, KickPlan};

/// One zero-length marker to install at `position`, tagged by `mode`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderRequest {
    pub name: String,
    pub position: f64,
    pub mode: KickMode,
}

impl PlaceholderRequest {
    pub fn slot_id(&self) -> u32 {
        self.mode.slot_id()
    }
}

/// One request per planned slot, in plan order.
pub fn placeholder_requests(plan: &KickPlan, mode: KickMode) -> Vec<PlaceholderRequest> {
    plan.slots
        .iter()
        .map(|slot| PlaceholderRequest {
            name: slot.name.clone(),
            position: slot.position,
            mode,
        })
        .collect()
}

/// Install the placeholders into the active sequence and refresh the optics.
pub fn install_placeholders<E: OpticsEngine + ?Sized>(
    engine: &mut E,
    requests: &[PlaceholderRequest],
) -> SpaceChargeResult<()> {
    engine.install_placeholders(requests)?;
    tracing::info!(installed = requests.len(), "placeholders installed");
    engine.recompute_optics()
}
