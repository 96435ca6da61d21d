// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Tracking Line
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Flat tracking line built from an edited lattice sequence.
//!
//! Thin elements alternate with drifts. Placeholders tagged with a kick slot
//! id turn into disabled space-charge elements of the matching mode, ready
//! for the parameterizer. Any other placeholder is kept as a marker. The
//! JSON snapshot keeps every float bit-exact.

use std::path::Path;

use serde::{Deserialize, Serialize};

use sc_optics::lattice::{ElementKind, Sequence};
use sc_types::error::{SpaceChargeError, SpaceChargeResult};
use sc_types::state::{KickElement, KickMode};

/// Gaps shorter than this are not given a drift.
const MIN_DRIFT_LENGTH: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LineElement {
    Drift {
        length: f64,
    },
    Multipole {
        knl: Vec<f64>,
        ksl: Vec<f64>,
        hxl: f64,
    },
    /// Voltage [V], frequency [Hz], lag [deg].
    Cavity {
        voltage: f64,
        frequency: f64,
        lag: f64,
    },
    Kicker {
        hkick: f64,
        vkick: f64,
    },
    Marker,
    SpaceChargeBunched(KickElement),
    SpaceChargeCoasting(KickElement),
}

impl LineElement {
    pub fn length(&self) -> f64 {
        match self {
            LineElement::Drift { length } => *length,
            _ => 0.0,
        }
    }

    pub fn kick(&self) -> Option<&KickElement> {
        match self {
            LineElement::SpaceChargeBunched(k) | LineElement::SpaceChargeCoasting(k) => Some(k),
            _ => None,
        }
    }

    fn kick_mut(&mut self, mode: KickMode) -> Option<&mut KickElement> {
        match (self, mode) {
            (LineElement::SpaceChargeBunched(k), KickMode::Bunched)
            | (LineElement::SpaceChargeCoasting(k), KickMode::Coasting) => Some(k),
            _ => None,
        }
    }

    fn from_kind(name: &str, kind: &ElementKind) -> Self {
        match *kind {
            ElementKind::Marker => LineElement::Marker,
            ElementKind::Quadrupole { k1l } => LineElement::Multipole {
                knl: vec![0.0, k1l],
                ksl: vec![0.0, 0.0],
                hxl: 0.0,
            },
            ElementKind::Sbend { angle } => LineElement::Multipole {
                knl: vec![angle],
                ksl: vec![0.0],
                hxl: angle,
            },
            ElementKind::HKicker { kick } => LineElement::Kicker {
                hkick: kick,
                vkick: 0.0,
            },
            ElementKind::VKicker { kick } => LineElement::Kicker {
                hkick: 0.0,
                vkick: kick,
            },
            ElementKind::RfCavity { volt, freq, lag } => LineElement::Cavity {
                voltage: volt * 1e6,
                frequency: freq * 1e6,
                lag,
            },
            ElementKind::Placeholder { slot_id } => match KickMode::from_slot_id(slot_id) {
                Some(KickMode::Bunched) => {
                    LineElement::SpaceChargeBunched(KickElement::new(name, KickMode::Bunched))
                }
                Some(KickMode::Coasting) => {
                    LineElement::SpaceChargeCoasting(KickElement::new(name, KickMode::Coasting))
                }
                None => LineElement::Marker,
            },
        }
    }
}

/// Ordered tracking line. `element_names[i]` labels `elements[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub element_names: Vec<String>,
    pub elements: Vec<LineElement>,
}

impl Line {
    /// Build the line from a sorted sequence, closing with a drift up to its length.
    pub fn from_sequence(seq: &Sequence) -> SpaceChargeResult<Self> {
        let mut element_names = Vec::with_capacity(2 * seq.elements.len() + 1);
        let mut elements = Vec::with_capacity(2 * seq.elements.len() + 1);
        let mut s = 0.0;
        let mut drifts = 0usize;

        let mut push_drift = |names: &mut Vec<String>, els: &mut Vec<LineElement>, gap: f64| {
            if gap > MIN_DRIFT_LENGTH {
                names.push(format!("drift_{drifts}"));
                els.push(LineElement::Drift { length: gap });
                drifts += 1;
            }
        };

        for el in &seq.elements {
            if el.at < s {
                return Err(SpaceChargeError::ExternalEngine(format!(
                    "sequence '{}' not sorted at '{}' ({} < {s})",
                    seq.name, el.name, el.at
                )));
            }
            push_drift(&mut element_names, &mut elements, el.at - s);
            element_names.push(el.name.clone());
            elements.push(LineElement::from_kind(&el.name, &el.kind));
            s = el.at;
        }
        push_drift(&mut element_names, &mut elements, seq.length - s);

        Ok(Line {
            element_names,
            elements,
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn total_length(&self) -> f64 {
        self.elements.iter().map(LineElement::length).sum()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.element_names.iter().position(|n| n == name)
    }

    pub fn element(&self, name: &str) -> Option<&LineElement> {
        self.index_of(name).map(|i| &self.elements[i])
    }

    pub fn element_mut(&mut self, name: &str) -> Option<&mut LineElement> {
        self.index_of(name).map(move |i| &mut self.elements[i])
    }

    /// Space-charge elements of `mode`, in line order.
    pub fn kicks_mut(&mut self, mode: KickMode) -> Vec<&mut KickElement> {
        self.elements
            .iter_mut()
            .filter_map(|el| el.kick_mut(mode))
            .collect()
    }

    pub fn kicks(&self, mode: KickMode) -> Vec<&KickElement> {
        self.elements
            .iter()
            .filter_map(LineElement::kick)
            .filter(|k| k.mode == mode)
            .collect()
    }

    pub fn kick_names(&self, mode: KickMode) -> Vec<String> {
        self.kicks(mode).into_iter().map(|k| k.name.clone()).collect()
    }

    /// Set voltage [V] and lag [deg] of the named cavity.
    pub fn set_cavity(&mut self, name: &str, voltage: f64, lag: f64) -> SpaceChargeResult<()> {
        match self.element_mut(name) {
            Some(LineElement::Cavity {
                voltage: v, lag: l, ..
            }) => {
                *v = voltage;
                *l = lag;
                Ok(())
            }
            Some(_) => Err(SpaceChargeError::MissingElement(format!(
                "'{name}' is not a cavity"
            ))),
            None => Err(SpaceChargeError::MissingElement(name.to_string())),
        }
    }

    pub fn to_json(&self) -> SpaceChargeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> SpaceChargeResult<Self> {
        let line: Line = serde_json::from_str(text)?;
        if line.element_names.len() != line.elements.len() {
            return Err(SpaceChargeError::InputShape(format!(
                "line has {} names for {} elements",
                line.element_names.len(),
                line.elements.len()
            )));
        }
        Ok(line)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SpaceChargeResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> SpaceChargeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
