// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Optics Session
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Owned optics-engine session.
//!
//! Holds every loaded sequence, the one currently in use, and the Twiss
//! table of its last computation. Editing the active sequence drops the
//! table, so optics can never be read against a stale lattice.

use crate::lattice::{import_lattice_text, ElementKind, Sequence};
use crate::twiss::{compute_twiss, TwissTable};
use sc_types::error::{SpaceChargeError, SpaceChargeResult};
use sc_types::state::{LatticePath, OpticsSample};

#[derive(Debug, Default)]
pub struct OpticsSession {
    sequences: Vec<Sequence>,
    active: Option<usize>,
    twiss: Option<TwissTable>,
}

impl OpticsSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a lattice file into the session.
    pub fn call(&mut self, path: &str) -> SpaceChargeResult<()> {
        let text = std::fs::read_to_string(path)?;
        self.load_text(&text).map_err(|e| match e {
            SpaceChargeError::ExternalEngine(msg) => {
                SpaceChargeError::ExternalEngine(format!("{path}: {msg}"))
            }
            other => other,
        })
    }

    /// Load a lattice from its text form. A sequence with an already known
    /// name replaces the earlier definition.
    pub fn load_text(&mut self, text: &str) -> SpaceChargeResult<()> {
        let seq = import_lattice_text(text)?;
        tracing::debug!(
            sequence = %seq.name,
            elements = seq.elements.len(),
            length = seq.length,
            "lattice loaded"
        );
        self.load_sequence(seq);
        Ok(())
    }

    pub fn load_sequence(&mut self, seq: Sequence) {
        match self.sequences.iter().position(|s| s.name == seq.name) {
            Some(idx) => {
                self.sequences[idx] = seq;
                if self.active == Some(idx) {
                    self.twiss = None;
                }
            }
            None => self.sequences.push(seq),
        }
    }

    /// Select the sequence subsequent requests act on.
    pub fn use_sequence(&mut self, name: &str) -> SpaceChargeResult<()> {
        let idx = self
            .sequences
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| {
                SpaceChargeError::ExternalEngine(format!("unknown sequence '{name}'"))
            })?;
        if self.active != Some(idx) {
            self.twiss = None;
        }
        self.active = Some(idx);
        Ok(())
    }

    pub fn sequence(&self) -> SpaceChargeResult<&Sequence> {
        self.active
            .map(|idx| &self.sequences[idx])
            .ok_or_else(|| SpaceChargeError::ExternalEngine("no sequence in use".to_string()))
    }

    fn sequence_mut(&mut self) -> SpaceChargeResult<&mut Sequence> {
        let idx = self
            .active
            .ok_or_else(|| SpaceChargeError::ExternalEngine("no sequence in use".to_string()))?;
        self.twiss = None;
        Ok(&mut self.sequences[idx])
    }

    pub fn lattice_path(&self) -> SpaceChargeResult<LatticePath> {
        Ok(self.sequence()?.lattice_path())
    }

    /// Install zero-length placeholders and re-sort the active sequence.
    /// Either every placeholder is installed or the sequence is left as it was.
    pub fn install_placeholders(&mut self, items: &[(String, f64, u32)]) -> SpaceChargeResult<()> {
        let seq = self.sequence_mut()?;
        let mut edited = seq.clone();
        for (name, at, slot_id) in items {
            edited.install(name.as_str(), *at, ElementKind::Placeholder { slot_id: *slot_id })?;
        }
        edited.flatten();
        edited.validate()?;
        *seq = edited;
        tracing::debug!(sequence = %seq.name, installed = items.len(), "placeholders installed");
        Ok(())
    }

    /// Compute and cache the Twiss table of the active sequence.
    pub fn twiss(&mut self) -> SpaceChargeResult<&TwissTable> {
        let table = compute_twiss(self.sequence()?)?;
        tracing::info!(
            sequence = %table.sequence,
            q1 = table.q1,
            q2 = table.q2,
            rows = table.len(),
            "twiss computed"
        );
        Ok(self.twiss.insert(table))
    }

    pub fn twiss_table(&self) -> Option<&TwissTable> {
        self.twiss.as_ref()
    }

    /// Optics at every placeholder with `slot_id`, in lattice order.
    pub fn points_for_slot(&self, slot_id: u32) -> SpaceChargeResult<Vec<OpticsSample>> {
        let table = self.twiss.as_ref().ok_or_else(|| {
            SpaceChargeError::ExternalEngine(
                "twiss must be computed after the last sequence edit".to_string(),
            )
        })?;
        let seq = self.sequence()?;
        let mut samples = Vec::new();
        for el in &seq.elements {
            if el.kind != (ElementKind::Placeholder { slot_id }) {
                continue;
            }
            let row = table.row(&el.name).ok_or_else(|| {
                SpaceChargeError::ExternalEngine(format!(
                    "element '{}' missing from twiss table",
                    el.name
                ))
            })?;
            samples.push(table.sample(row));
        }
        Ok(samples)
    }
}
