// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::constants::PROTON_MASS_EV;
use crate::error::{SpaceChargeError, SpaceChargeResult};
use crate::state::{BeamParams, KickMode};

/// Top-level preparation configuration.
/// Every section falls back to the SPS reference setup when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceChargeConfig {
    #[serde(default = "default_sequence_name")]
    pub sequence_name: String,
    #[serde(default = "default_lattice_file")]
    pub lattice_file: String,
    #[serde(default = "default_output_file")]
    pub output_file: String,
    #[serde(default)]
    pub beam: BeamConfig,
    #[serde(default)]
    pub kicks: KickConfig,
    #[serde(default)]
    pub rf: RfConfig,
}

/// Beam and bunch parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamConfig {
    /// Reference momentum times c [eV]
    #[serde(default = "default_p0c_ev")]
    pub p0c_ev: f64,
    /// Rest energy [eV] (default: proton)
    #[serde(default = "default_mass_ev")]
    pub mass_ev: f64,
    /// Particles per bunch
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    /// Normalised horizontal emittance [m rad]
    #[serde(default = "default_neps")]
    pub neps_x: f64,
    /// Normalised vertical emittance [m rad]
    #[serde(default = "default_neps")]
    pub neps_y: f64,
    /// RMS relative momentum spread
    #[serde(default = "default_dpp_rms")]
    pub dpp_rms: f64,
    /// RMS bunch length [m]
    #[serde(default = "default_bunchlength_rms")]
    pub bunchlength_rms: f64,
}

/// Kick placement parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KickConfig {
    #[serde(default = "default_kick_count")]
    pub count: usize,
    /// Full snap window [m]; a target snaps when within half of it.
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance: f64,
    #[serde(default)]
    pub mode: KickMode,
}

/// RF cavity switched on after the kicks are configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfConfig {
    #[serde(default = "default_cavity")]
    pub cavity: String,
    #[serde(default = "default_voltage_mv")]
    pub voltage_mv: f64,
    #[serde(default = "default_lag_deg")]
    pub lag_deg: f64,
}

fn default_sequence_name() -> String {
    "sps".to_string()
}
fn default_lattice_file() -> String {
    "sps_thin.lat".to_string()
}
fn default_output_file() -> String {
    "line.json".to_string()
}
fn default_p0c_ev() -> f64 {
    25.92e9
}
fn default_mass_ev() -> f64 {
    PROTON_MASS_EV
}
fn default_intensity() -> f64 {
    2e11
}
fn default_neps() -> f64 {
    2e-6
}
fn default_dpp_rms() -> f64 {
    1.5e-3
}
fn default_bunchlength_rms() -> f64 {
    0.22
}
fn default_kick_count() -> usize {
    100
}
fn default_snap_tolerance() -> f64 {
    1.5
}
fn default_cavity() -> String {
    "acta.31637".to_string()
}
fn default_voltage_mv() -> f64 {
    4.5
}
fn default_lag_deg() -> f64 {
    180.0
}

impl Default for BeamConfig {
    fn default() -> Self {
        BeamConfig {
            p0c_ev: default_p0c_ev(),
            mass_ev: default_mass_ev(),
            intensity: default_intensity(),
            neps_x: default_neps(),
            neps_y: default_neps(),
            dpp_rms: default_dpp_rms(),
            bunchlength_rms: default_bunchlength_rms(),
        }
    }
}

impl Default for KickConfig {
    fn default() -> Self {
        KickConfig {
            count: default_kick_count(),
            snap_tolerance: default_snap_tolerance(),
            mode: KickMode::default(),
        }
    }
}

impl Default for RfConfig {
    fn default() -> Self {
        RfConfig {
            cavity: default_cavity(),
            voltage_mv: default_voltage_mv(),
            lag_deg: default_lag_deg(),
        }
    }
}

impl Default for SpaceChargeConfig {
    fn default() -> Self {
        SpaceChargeConfig {
            sequence_name: default_sequence_name(),
            lattice_file: default_lattice_file(),
            output_file: default_output_file(),
            beam: BeamConfig::default(),
            kicks: KickConfig::default(),
            rf: RfConfig::default(),
        }
    }
}

fn require_positive(key: &str, value: f64) -> SpaceChargeResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SpaceChargeError::Config(format!(
            "{key} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}

fn require_non_negative(key: &str, value: f64) -> SpaceChargeResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SpaceChargeError::Config(format!(
            "{key} must be finite and >= 0, got {value}"
        )));
    }
    Ok(())
}

impl BeamConfig {
    /// Relativistic beta*gamma = p0c / mc^2.
    pub fn beta_gamma(&self) -> f64 {
        self.p0c_ev / self.mass_ev
    }
}

impl SpaceChargeConfig {
    /// Load from a JSON file and validate.
    pub fn from_file(path: &str) -> SpaceChargeResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SpaceChargeResult<()> {
        if self.sequence_name.trim().is_empty() {
            return Err(SpaceChargeError::Config(
                "sequence_name must not be empty".to_string(),
            ));
        }
        require_positive("beam.p0c_ev", self.beam.p0c_ev)?;
        require_positive("beam.mass_ev", self.beam.mass_ev)?;
        require_non_negative("beam.intensity", self.beam.intensity)?;
        require_non_negative("beam.neps_x", self.beam.neps_x)?;
        require_non_negative("beam.neps_y", self.beam.neps_y)?;
        require_non_negative("beam.dpp_rms", self.beam.dpp_rms)?;
        require_non_negative("beam.bunchlength_rms", self.beam.bunchlength_rms)?;
        if self.kicks.count < 1 {
            return Err(SpaceChargeError::Config(format!(
                "kicks.count must be >= 1, got {}",
                self.kicks.count
            )));
        }
        require_non_negative("kicks.snap_tolerance", self.kicks.snap_tolerance)?;
        if !self.rf.voltage_mv.is_finite() || !self.rf.lag_deg.is_finite() {
            return Err(SpaceChargeError::Config(format!(
                "rf settings must be finite, got voltage_mv={}, lag_deg={}",
                self.rf.voltage_mv, self.rf.lag_deg
            )));
        }
        Ok(())
    }

    /// Per-kick beam parameters derived from this config.
    pub fn beam_params(&self) -> BeamParams {
        BeamParams {
            intensity: self.beam.intensity,
            emittance_x: self.beam.neps_x,
            emittance_y: self.beam.neps_y,
            momentum_spread_rms: self.beam.dpp_rms,
            bunch_length_rms: self.beam.bunchlength_rms,
            beta_gamma: self.beam.beta_gamma(),
        }
    }
}
