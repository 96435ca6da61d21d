// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Kick Location Planner
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Space-charge kick placement along the machine.
//!
//! Kicks start on a uniform grid `i * L / N`. A grid target moves onto the
//! nearest existing element boundary when that boundary lies within half the
//! snap tolerance, so no kick ends up a negligible distance from real
//! structure. Each kick then represents the slice up to the next kick, the
//! last one wrapping around the ring to the first kick, so the slices always
//! add up to `L`.

use sc_types::constants::KICK_NAME_PREFIX;
use sc_types::error::{SpaceChargeError, SpaceChargeResult};
use sc_types::state::{validate_positions, KickPlan, KickSlot, LatticePath};

/// Nearest entry of a sorted slice, `None` when it is empty.
/// Ties go to the lower position.
pub fn nearest_position(sorted: &[f64], target: f64) -> Option<f64> {
    let i = sorted.partition_point(|&p| p < target);
    match (i.checked_sub(1).map(|j| sorted[j]), sorted.get(i).copied()) {
        (Some(lower), Some(upper)) => {
            if target - lower <= upper - target {
                Some(lower)
            } else {
                Some(upper)
            }
        }
        (Some(lower), None) => Some(lower),
        (None, upper) => upper,
    }
}

/// Snap `target` onto the nearest element if it lies within `snap_tolerance / 2`.
pub fn snap_target(sorted: &[f64], target: f64, snap_tolerance: f64) -> f64 {
    match nearest_position(sorted, target) {
        Some(nearest) if (target - nearest).abs() <= 0.5 * snap_tolerance => nearest,
        _ => target,
    }
}

fn validate_plan_inputs(
    path_length: f64,
    element_positions: &[f64],
    kick_count: usize,
    snap_tolerance: f64,
) -> SpaceChargeResult<f64> {
    if !path_length.is_finite() || path_length <= 0.0 {
        return Err(SpaceChargeError::InputShape(format!(
            "path length must be finite and > 0, got {path_length}"
        )));
    }
    if kick_count < 1 {
        return Err(SpaceChargeError::InputShape(
            "kick count must be >= 1".to_string(),
        ));
    }
    if !snap_tolerance.is_finite() || snap_tolerance < 0.0 {
        return Err(SpaceChargeError::InputShape(format!(
            "snap tolerance must be finite and >= 0, got {snap_tolerance}"
        )));
    }
    validate_positions(element_positions, path_length)?;
    let step = path_length / kick_count as f64;
    // Two neighbouring targets can move towards each other by at most
    // tolerance/2 each, so ordering holds while tolerance <= step.
    // tolerance == step is accepted; neighbours may then meet but not cross.
    if snap_tolerance > step {
        return Err(SpaceChargeError::InputShape(format!(
            "snap tolerance {snap_tolerance} exceeds kick spacing {step}; kicks could reorder"
        )));
    }
    Ok(step)
}

/// Plan `kick_count` kicks named `sc0..`, see [`plan_named`].
pub fn plan(
    path_length: f64,
    element_positions: &[f64],
    kick_count: usize,
    snap_tolerance: f64,
) -> SpaceChargeResult<KickPlan> {
    plan_named(
        path_length,
        element_positions,
        kick_count,
        snap_tolerance,
        KICK_NAME_PREFIX,
    )
}

/// Plan `kick_count` kicks over `[0, path_length)`, named `{prefix}{index}`.
pub fn plan_named(
    path_length: f64,
    element_positions: &[f64],
    kick_count: usize,
    snap_tolerance: f64,
    prefix: &str,
) -> SpaceChargeResult<KickPlan> {
    let step = validate_plan_inputs(path_length, element_positions, kick_count, snap_tolerance)?;

    let positions: Vec<f64> = (0..kick_count)
        .map(|i| snap_target(element_positions, i as f64 * step, snap_tolerance))
        .collect();

    if let Some(i) = positions.windows(2).position(|w| w[1] < w[0]) {
        return Err(SpaceChargeError::InputShape(format!(
            "kick positions inverted at index {}: {} < {}",
            i + 1,
            positions[i + 1],
            positions[i]
        )));
    }

    // Target 0 may snap off s = 0; the last slice then wraps to the first kick.
    let wrap = path_length + positions[0];
    let slots: Vec<KickSlot> = positions
        .iter()
        .enumerate()
        .map(|(index, &position)| {
            let next = positions.get(index + 1).copied().unwrap_or(wrap);
            KickSlot {
                index,
                name: format!("{prefix}{index}"),
                position,
                length: next - position,
            }
        })
        .collect();

    let plan = KickPlan { path_length, slots };
    let summary = plan.summary();
    tracing::debug!(
        kicks = summary.count,
        step,
        min_length = summary.min_length,
        max_length = summary.max_length,
        "kick plan built"
    );
    Ok(plan)
}

/// Plan kicks over a lattice path, using the path length as `L`.
pub fn plan_for_path(
    path: &LatticePath,
    kick_count: usize,
    snap_tolerance: f64,
) -> SpaceChargeResult<KickPlan> {
    path.validate()?;
    plan(path.length, &path.positions, kick_count, snap_tolerance)
}
