// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Preparation Pipeline
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Single-pass preparation of a tracking line with space-charge kicks.
//!
//! plan → install placeholders → optics → build line → parameterize →
//! switch on RF. The first failing stage aborts the run.

use std::path::Path;

use tracing::info;

use crate::engine::OpticsEngine;
use crate::installer::{install_placeholders, placeholder_requests};
use crate::line::Line;
use crate::parameterizer::parameterize_plan;
use crate::planner::plan_for_path;
use sc_types::config::SpaceChargeConfig;
use sc_types::error::SpaceChargeResult;
use sc_types::state::KickPlan;

/// Tracking line with parameterized kicks, plus the plan it was built from.
#[derive(Debug, Clone)]
pub struct PreparedLine {
    pub line: Line,
    pub plan: KickPlan,
}

impl PreparedLine {
    pub fn write_line(&self, path: impl AsRef<Path>) -> SpaceChargeResult<()> {
        let path = path.as_ref();
        self.line.save(path)?;
        info!(path = %path.display(), elements = self.line.len(), "line written");
        Ok(())
    }
}

pub fn prepare_line<E: OpticsEngine + ?Sized>(
    engine: &mut E,
    config: &SpaceChargeConfig,
) -> SpaceChargeResult<PreparedLine> {
    config.validate()?;
    let span = tracing::info_span!("prepare_line", sequence = %config.sequence_name);
    let _enter = span.enter();

    engine.use_sequence(&config.sequence_name)?;
    let path = engine.lattice_path()?;
    info!(elements = path.len(), length = path.length, "lattice path read");

    let plan = plan_for_path(&path, config.kicks.count, config.kicks.snap_tolerance)?;
    let summary = plan.summary();
    info!(
        kicks = summary.count,
        min_length = summary.min_length,
        max_length = summary.max_length,
        mean_length = summary.mean_length,
        "kick locations planned"
    );

    let mode = config.kicks.mode;
    let requests = placeholder_requests(&plan, mode);
    install_placeholders(engine, &requests)?;

    let optics = engine.optics_for_placeholders(mode.slot_id())?;
    let mut line = engine.line()?;
    info!(elements = line.len(), length = line.total_length(), "tracking line built");

    let beam = config.beam_params();
    {
        let mut kicks = line.kicks_mut(mode);
        parameterize_plan(&mut kicks, &plan, &optics, &beam)?;
    }
    info!(kicks = plan.len(), ?mode, "kicks parameterized");

    line.set_cavity(
        &config.rf.cavity,
        config.rf.voltage_mv * 1e6,
        config.rf.lag_deg,
    )?;
    info!(
        cavity = %config.rf.cavity,
        voltage_mv = config.rf.voltage_mv,
        lag_deg = config.rf.lag_deg,
        "rf configured"
    );

    Ok(PreparedLine { line, plan })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineElement;
    use sc_optics::session::OpticsSession;
    use sc_types::error::SpaceChargeError;
    use sc_types::state::KickMode;

    const RING: &str = "format=sc_lattice_v1\n\
                        sequence=ring\n\
                        length=40.0\n\
                        element,qf1,quadrupole,0.0,k1l=0.125\n\
                        element,qd1,quadrupole,10.0,k1l=-0.125\n\
                        element,cav,rfcavity,15.0,volt=0.0,freq=200.0,lag=0.0\n\
                        element,qf2,quadrupole,20.0,k1l=0.125\n\
                        element,qd2,quadrupole,30.0,k1l=-0.125\n";

    fn config() -> SpaceChargeConfig {
        let mut cfg = SpaceChargeConfig::default();
        cfg.sequence_name = "ring".into();
        cfg.kicks.count = 8;
        cfg.kicks.snap_tolerance = 0.5;
        cfg.rf.cavity = "cav".into();
        cfg
    }

    fn session() -> OpticsSession {
        let mut s = OpticsSession::new();
        s.load_text(RING).unwrap();
        s
    }

    #[test]
    fn test_prepare_line_end_to_end() {
        let mut s = session();
        let prepared = prepare_line(&mut s, &config()).unwrap();
        assert_eq!(prepared.plan.len(), 8);
        assert!(prepared.plan.is_partition());

        let kicks = prepared.line.kicks(KickMode::Bunched);
        assert_eq!(kicks.len(), 8);
        for (kick, slot) in kicks.iter().zip(&prepared.plan.slots) {
            assert_eq!(kick.name, slot.name);
            assert!(kick.enabled);
            assert_eq!(kick.length, slot.length);
            assert!(kick.sigma_x > 0.0 && kick.sigma_y > 0.0);
        }
        match prepared.line.element("cav").unwrap() {
            LineElement::Cavity { voltage, lag, .. } => {
                assert_eq!(*voltage, 4.5e6);
                assert_eq!(*lag, 180.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!((prepared.line.total_length() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_cavity_aborts() {
        let mut s = session();
        let mut cfg = config();
        cfg.rf.cavity = "acta.31637".into();
        let err = prepare_line(&mut s, &cfg).unwrap_err();
        assert!(matches!(err, SpaceChargeError::MissingElement(_)));
    }

    #[test]
    fn test_unknown_sequence_is_engine_error() {
        let mut s = session();
        let mut cfg = config();
        cfg.sequence_name = "lhc".into();
        let err = prepare_line(&mut s, &cfg).unwrap_err();
        assert!(matches!(err, SpaceChargeError::ExternalEngine(_)));
    }

    #[test]
    fn test_untagged_placeholder_passes_through() {
        let text = RING.replace(
            "element,qd1,",
            "element,mon,placeholder,5.0\nelement,qd1,",
        );
        let mut s = OpticsSession::new();
        s.load_text(&text).unwrap();
        let prepared = prepare_line(&mut s, &config()).unwrap();
        assert_eq!(prepared.line.element("mon"), Some(&LineElement::Marker));
        assert_eq!(prepared.line.kicks(KickMode::Bunched).len(), 8);
        assert!(prepared.line.kicks(KickMode::Coasting).is_empty());
    }

    #[test]
    fn test_coasting_mode_uses_coasting_slots() {
        let mut s = session();
        let mut cfg = config();
        cfg.kicks.mode = KickMode::Coasting;
        let prepared = prepare_line(&mut s, &cfg).unwrap();
        assert!(prepared.line.kicks(KickMode::Bunched).is_empty());
        assert_eq!(prepared.line.kicks(KickMode::Coasting).len(), 8);
    }
}
