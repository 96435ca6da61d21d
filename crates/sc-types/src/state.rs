// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::constants::{PARTITION_REL_TOLERANCE, SLOT_ID_BUNCHED, SLOT_ID_COASTING};
use crate::error::{SpaceChargeError, SpaceChargeResult};

/// Longitudinal positions of every element along the machine.
/// `names[i]` sits at `positions[i]`; the path closes at `length`.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticePath {
    pub length: f64,
    pub names: Vec<String>,
    pub positions: Vec<f64>,
}

impl LatticePath {
    pub fn new(length: f64, names: Vec<String>, positions: Vec<f64>) -> Self {
        LatticePath {
            length,
            names,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn validate(&self) -> SpaceChargeResult<()> {
        if !self.length.is_finite() || self.length <= 0.0 {
            return Err(SpaceChargeError::InputShape(format!(
                "lattice path length must be finite and > 0, got {}",
                self.length
            )));
        }
        if self.names.len() != self.positions.len() {
            return Err(SpaceChargeError::InputShape(format!(
                "lattice path names/positions length mismatch: names={}, positions={}",
                self.names.len(),
                self.positions.len()
            )));
        }
        validate_positions(&self.positions, self.length)
    }
}

/// Shared check for element positions: non-empty, finite, sorted, within `[0, length]`.
pub fn validate_positions(positions: &[f64], length: f64) -> SpaceChargeResult<()> {
    if positions.is_empty() {
        return Err(SpaceChargeError::InputShape(
            "element positions must not be empty".to_string(),
        ));
    }
    let mut prev = 0.0;
    for (idx, &s) in positions.iter().enumerate() {
        if !s.is_finite() {
            return Err(SpaceChargeError::InputShape(format!(
                "element position[{idx}] must be finite, got {s}"
            )));
        }
        if s < 0.0 || s > length {
            return Err(SpaceChargeError::InputShape(format!(
                "element position[{idx}]={s} outside [0, {length}]"
            )));
        }
        if s < prev {
            return Err(SpaceChargeError::InputShape(format!(
                "element positions not sorted at index {idx}: {s} < {prev}"
            )));
        }
        prev = s;
    }
    Ok(())
}

/// Space-charge kick flavour. Maps 1:1 to the placeholder slot id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KickMode {
    Coasting,
    #[default]
    Bunched,
}

impl KickMode {
    pub fn slot_id(self) -> u32 {
        match self {
            KickMode::Coasting => SLOT_ID_COASTING,
            KickMode::Bunched => SLOT_ID_BUNCHED,
        }
    }

    pub fn from_slot_id(slot_id: u32) -> Option<Self> {
        match slot_id {
            SLOT_ID_COASTING => Some(KickMode::Coasting),
            SLOT_ID_BUNCHED => Some(KickMode::Bunched),
            _ => None,
        }
    }
}

/// One planned kick. `index` and `name` travel with the kick through
/// placeholder installation so it can be re-identified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct KickSlot {
    pub index: usize,
    pub name: String,
    pub position: f64,
    pub length: f64,
}

/// Planned kick locations; slice lengths partition `[0, path_length)`.
#[derive(Debug, Clone, PartialEq)]
pub struct KickPlan {
    pub path_length: f64,
    pub slots: Vec<KickSlot>,
}

/// Slice-length statistics of a plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanSummary {
    pub count: usize,
    pub min_length: f64,
    pub max_length: f64,
    pub mean_length: f64,
}

impl KickPlan {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn positions(&self) -> Vec<f64> {
        self.slots.iter().map(|s| s.position).collect()
    }

    pub fn lengths(&self) -> Vec<f64> {
        self.slots.iter().map(|s| s.length).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn total_length(&self) -> f64 {
        self.slots.iter().map(|s| s.length).sum()
    }

    /// True when the slice lengths add up to the path length.
    pub fn is_partition(&self) -> bool {
        let tol = PARTITION_REL_TOLERANCE * self.path_length.abs().max(1.0);
        (self.total_length() - self.path_length).abs() <= tol
    }

    pub fn summary(&self) -> PlanSummary {
        if self.slots.is_empty() {
            return PlanSummary {
                count: 0,
                min_length: 0.0,
                max_length: 0.0,
                mean_length: 0.0,
            };
        }
        let lengths = self.lengths();
        PlanSummary {
            count: lengths.len(),
            min_length: lengths.iter().cloned().fold(f64::INFINITY, f64::min),
            max_length: lengths.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            mean_length: lengths.iter().sum::<f64>() / lengths.len() as f64,
        }
    }
}

/// Linear optics at one kick location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticsSample {
    pub name: String,
    pub s: f64,
    pub beta_x: f64,
    pub beta_y: f64,
    pub dispersion_x: f64,
    pub dispersion_y: f64,
    /// Closed-orbit offsets [m]
    pub x: f64,
    pub y: f64,
}

/// Space-charge kick as seen by the tracking line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KickElement {
    pub name: String,
    pub mode: KickMode,
    pub number_of_particles: f64,
    pub bunchlength_rms: f64,
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
    pub length: f64,
    pub enabled: bool,
}

impl KickElement {
    /// Fresh, disabled kick with all physics fields zeroed.
    pub fn new(name: impl Into<String>, mode: KickMode) -> Self {
        KickElement {
            name: name.into(),
            mode,
            number_of_particles: 0.0,
            bunchlength_rms: 0.0,
            sigma_x: 0.0,
            sigma_y: 0.0,
            delta_x: 0.0,
            delta_y: 0.0,
            length: 0.0,
            enabled: false,
        }
    }
}

/// Global beam parameters shared by every kick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamParams {
    pub intensity: f64,
    /// Normalised emittances [m rad]
    pub emittance_x: f64,
    pub emittance_y: f64,
    pub momentum_spread_rms: f64,
    pub bunch_length_rms: f64,
    pub beta_gamma: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(index: usize, position: f64, length: f64) -> KickSlot {
        KickSlot {
            index,
            name: format!("sc{index}"),
            position,
            length,
        }
    }

    #[test]
    fn test_lattice_path_validation() {
        let path = LatticePath::new(
            10.0,
            vec!["a".into(), "b".into(), "c".into()],
            vec![0.0, 5.0, 10.0],
        );
        assert!(path.validate().is_ok());

        let unsorted = LatticePath::new(10.0, vec!["a".into(), "b".into()], vec![5.0, 1.0]);
        assert!(unsorted.validate().is_err());

        let beyond = LatticePath::new(10.0, vec!["a".into()], vec![10.5]);
        assert!(beyond.validate().is_err());

        let empty = LatticePath::new(10.0, vec![], vec![]);
        assert!(empty.validate().is_err());

        let zero_len = LatticePath::new(0.0, vec!["a".into()], vec![0.0]);
        assert!(zero_len.validate().is_err());

        let ragged = LatticePath::new(10.0, vec!["a".into()], vec![0.0, 1.0]);
        assert!(ragged.validate().is_err());
    }

    #[test]
    fn test_ties_allowed_in_positions() {
        assert!(validate_positions(&[0.0, 2.0, 2.0, 3.0], 3.0).is_ok());
    }

    #[test]
    fn test_kick_mode_slot_ids() {
        assert_eq!(KickMode::Coasting.slot_id(), 1);
        assert_eq!(KickMode::Bunched.slot_id(), 2);
        assert_eq!(KickMode::from_slot_id(2), Some(KickMode::Bunched));
        assert_eq!(KickMode::from_slot_id(1), Some(KickMode::Coasting));
        assert_eq!(KickMode::from_slot_id(0), None);
        assert_eq!(KickMode::default(), KickMode::Bunched);
    }

    #[test]
    fn test_kick_mode_serde_names() {
        let json = serde_json::to_string(&KickMode::Coasting).unwrap();
        assert_eq!(json, "\"coasting\"");
        let mode: KickMode = serde_json::from_str("\"bunched\"").unwrap();
        assert_eq!(mode, KickMode::Bunched);
    }

    #[test]
    fn test_plan_partition_and_summary() {
        let plan = KickPlan {
            path_length: 10.0,
            slots: vec![slot(0, 0.0, 3.0), slot(1, 3.0, 2.0), slot(2, 5.0, 5.0)],
        };
        assert!(plan.is_partition());
        assert_eq!(plan.names(), vec!["sc0", "sc1", "sc2"]);
        let summary = plan.summary();
        assert_eq!(summary.count, 3);
        assert!((summary.min_length - 2.0).abs() < 1e-12);
        assert!((summary.max_length - 5.0).abs() < 1e-12);
        assert!((summary.mean_length - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_kick_is_disabled() {
        let kick = KickElement::new("sc7", KickMode::Bunched);
        assert_eq!(kick.name, "sc7");
        assert!(!kick.enabled);
        assert_eq!(kick.sigma_x, 0.0);
        assert_eq!(kick.length, 0.0);
    }
}
