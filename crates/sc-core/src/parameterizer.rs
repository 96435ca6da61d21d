// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Kick Parameterizer
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-kick beam parameters from the optics at each kick location.
//!
//! Kicks, slice lengths and optics samples are three parallel sequences.
//! Their lengths and names are checked in full before the first write, so a
//! rejected call leaves every kick untouched.

use sc_types::error::{SpaceChargeError, SpaceChargeResult};
use sc_types::state::{BeamParams, KickElement, KickPlan, OpticsSample};

/// RMS beam size from betatron and dispersive contributions:
/// `sqrt(beta * eps / beta_gamma + (dispersion * dpp)^2)`.
pub fn beam_sigma(
    beta: f64,
    emittance: f64,
    beta_gamma: f64,
    dispersion: f64,
    momentum_spread_rms: f64,
) -> f64 {
    let dispersive = dispersion * momentum_spread_rms;
    (beta * emittance / beta_gamma + dispersive * dispersive).sqrt()
}

fn check_counts(kicks: usize, lengths: usize, optics: usize) -> SpaceChargeResult<()> {
    if kicks != lengths || kicks != optics {
        return Err(SpaceChargeError::CountMismatch {
            kicks,
            lengths,
            optics,
        });
    }
    Ok(())
}

fn check_correlation(kicks: &[&mut KickElement], optics: &[OpticsSample]) -> SpaceChargeResult<()> {
    for (index, (kick, sample)) in kicks.iter().zip(optics).enumerate() {
        if kick.name != sample.name {
            return Err(SpaceChargeError::Correlation {
                index,
                kick: kick.name.clone(),
                optics: sample.name.clone(),
            });
        }
    }
    Ok(())
}

fn check_beam(beam: &BeamParams) -> SpaceChargeResult<()> {
    if !beam.beta_gamma.is_finite() || beam.beta_gamma <= 0.0 {
        return Err(SpaceChargeError::InputShape(format!(
            "beta_gamma must be finite and > 0, got {}",
            beam.beta_gamma
        )));
    }
    Ok(())
}

/// Write beam sizes, closed-orbit offsets, slice length, intensity and bunch
/// length into each kick and enable it.
pub fn parameterize(
    kicks: &mut [&mut KickElement],
    lengths: &[f64],
    optics: &[OpticsSample],
    beam: &BeamParams,
) -> SpaceChargeResult<()> {
    check_counts(kicks.len(), lengths.len(), optics.len())?;
    check_correlation(kicks, optics)?;
    check_beam(beam)?;

    for ((kick, &length), sample) in kicks.iter_mut().zip(lengths).zip(optics) {
        kick.sigma_x = beam_sigma(
            sample.beta_x,
            beam.emittance_x,
            beam.beta_gamma,
            sample.dispersion_x,
            beam.momentum_spread_rms,
        );
        kick.sigma_y = beam_sigma(
            sample.beta_y,
            beam.emittance_y,
            beam.beta_gamma,
            sample.dispersion_y,
            beam.momentum_spread_rms,
        );
        kick.delta_x = sample.x;
        kick.delta_y = sample.y;
        kick.length = length;
        kick.number_of_particles = beam.intensity;
        kick.bunchlength_rms = beam.bunch_length_rms;
        kick.enabled = true;
        tracing::debug!(
            kick = %kick.name,
            s = sample.s,
            sigma_x = kick.sigma_x,
            sigma_y = kick.sigma_y,
            length,
            "kick parameterized"
        );
    }
    Ok(())
}

/// [`parameterize`] with lengths taken from `plan`. Kick names must also
/// match the planned slot names, index by index.
pub fn parameterize_plan(
    kicks: &mut [&mut KickElement],
    plan: &KickPlan,
    optics: &[OpticsSample],
    beam: &BeamParams,
) -> SpaceChargeResult<()> {
    check_counts(kicks.len(), plan.len(), optics.len())?;
    for (kick, slot) in kicks.iter().zip(&plan.slots) {
        if kick.name != slot.name {
            return Err(SpaceChargeError::PlanMismatch {
                index: slot.index,
                kick: kick.name.clone(),
                slot: slot.name.clone(),
            });
        }
    }
    parameterize(kicks, &plan.lengths(), optics, beam)
}
