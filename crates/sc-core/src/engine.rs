// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Optics Engine Interface
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Operations the preparation pipeline needs from a lattice/optics engine.

use sc_optics::session::OpticsSession;
use sc_types::error::SpaceChargeResult;
use sc_types::state::{LatticePath, OpticsSample};

use crate::installer::PlaceholderRequest;
use crate::line::Line;

pub trait OpticsEngine {
    /// Select the sequence every later call acts on.
    fn use_sequence(&mut self, name: &str) -> SpaceChargeResult<()>;

    fn lattice_path(&self) -> SpaceChargeResult<LatticePath>;

    /// Install every placeholder or none of them.
    fn install_placeholders(&mut self, requests: &[PlaceholderRequest]) -> SpaceChargeResult<()>;

    fn recompute_optics(&mut self) -> SpaceChargeResult<()>;

    /// Optics at each placeholder tagged `slot_id`, in lattice order.
    /// Only valid after [`OpticsEngine::recompute_optics`].
    fn optics_for_placeholders(&self, slot_id: u32) -> SpaceChargeResult<Vec<OpticsSample>>;

    /// Tracking line of the current (edited) sequence.
    fn line(&self) -> SpaceChargeResult<Line>;
}

impl OpticsEngine for OpticsSession {
    fn use_sequence(&mut self, name: &str) -> SpaceChargeResult<()> {
        OpticsSession::use_sequence(self, name)
    }

    fn lattice_path(&self) -> SpaceChargeResult<LatticePath> {
        OpticsSession::lattice_path(self)
    }

    fn install_placeholders(&mut self, requests: &[PlaceholderRequest]) -> SpaceChargeResult<()> {
        let items: Vec<(String, f64, u32)> = requests
            .iter()
            .map(|r| (r.name.clone(), r.position, r.slot_id()))
            .collect();
        OpticsSession::install_placeholders(self, &items)
    }

    fn recompute_optics(&mut self) -> SpaceChargeResult<()> {
        self.twiss().map(|_| ())
    }

    fn optics_for_placeholders(&self, slot_id: u32) -> SpaceChargeResult<Vec<OpticsSample>> {
        self.points_for_slot(slot_id)
    }

    fn line(&self) -> SpaceChargeResult<Line> {
        Line::from_sequence(self.sequence()?)
    }
}
