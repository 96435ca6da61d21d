// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Thin Lattice Sequences
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Thin-element accelerator sequences and their `sc_lattice_v1` text form.
//!
//! Every element is zero-length and sits at a longitudinal position `at`;
//! the space between consecutive elements is field-free drift. This is the
//! same shape a fully sliced (thin) MAD-X sequence has after `makethin`.
//!
//! Text layout:
//!
//! ```text
//! format=sc_lattice_v1
//! sequence=ring
//! length=100.0
//! element,qf,quadrupole,0.0,k1l=0.05
//! element,mb,sbend,12.5,angle=0.01
//! ```

use sc_types::error::{SpaceChargeError, SpaceChargeResult};
use sc_types::state::LatticePath;
use std::collections::HashSet;

const FORMAT_TAG: &str = "sc_lattice_v1";

/// Physics carried by a thin element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementKind {
    Marker,
    /// Integrated normal quadrupole strength k1*L [1/m]; positive focuses horizontally.
    Quadrupole { k1l: f64 },
    /// Horizontal bending angle [rad].
    Sbend { angle: f64 },
    HKicker { kick: f64 },
    VKicker { kick: f64 },
    /// Voltage [MV], frequency [MHz], lag [deg].
    RfCavity { volt: f64, freq: f64, lag: f64 },
    /// Zero-length slot reserved for later replacement, tagged by slot id.
    Placeholder { slot_id: u32 },
}

impl ElementKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            ElementKind::Marker => "marker",
            ElementKind::Quadrupole { .. } => "quadrupole",
            ElementKind::Sbend { .. } => "sbend",
            ElementKind::HKicker { .. } => "hkicker",
            ElementKind::VKicker { .. } => "vkicker",
            ElementKind::RfCavity { .. } => "rfcavity",
            ElementKind::Placeholder { .. } => "placeholder",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceElement {
    pub name: String,
    pub kind: ElementKind,
    pub at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub name: String,
    pub length: f64,
    pub elements: Vec<SequenceElement>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, length: f64) -> Self {
        Sequence {
            name: name.into(),
            length,
            elements: Vec::new(),
        }
    }

    pub fn validate(&self) -> SpaceChargeResult<()> {
        if self.name.trim().is_empty() {
            return Err(engine_err("sequence name must not be empty".to_string()));
        }
        if !self.length.is_finite() || self.length <= 0.0 {
            return Err(engine_err(format!(
                "sequence '{}' requires finite length > 0, got {}",
                self.name, self.length
            )));
        }
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.elements.len());
        let mut prev = 0.0;
        for (idx, el) in self.elements.iter().enumerate() {
            if !el.at.is_finite() || el.at < 0.0 || el.at > self.length {
                return Err(engine_err(format!(
                    "sequence '{}' element[{idx}] '{}' at={} outside [0, {}]",
                    self.name, el.name, el.at, self.length
                )));
            }
            if el.at < prev {
                return Err(engine_err(format!(
                    "sequence '{}' element[{idx}] '{}' out of order: at={} < {}",
                    self.name, el.name, el.at, prev
                )));
            }
            prev = el.at;
            if !seen.insert(el.name.as_str()) {
                return Err(engine_err(format!(
                    "sequence '{}' contains duplicate element '{}'",
                    self.name, el.name
                )));
            }
            validate_kind(&el.name, &el.kind)?;
        }
        Ok(())
    }

    /// Append an element; call [`Sequence::flatten`] afterwards to restore order.
    pub fn install(
        &mut self,
        name: impl Into<String>,
        at: f64,
        kind: ElementKind,
    ) -> SpaceChargeResult<()> {
        let name = name.into();
        if !at.is_finite() || at < 0.0 || at > self.length {
            return Err(engine_err(format!(
                "cannot install '{name}' at {at}: outside [0, {}]",
                self.length
            )));
        }
        if self.elements.iter().any(|e| e.name == name) {
            return Err(engine_err(format!(
                "cannot install '{name}': name already used in '{}'",
                self.name
            )));
        }
        validate_kind(&name, &kind)?;
        self.elements.push(SequenceElement { name, kind, at });
        Ok(())
    }

    /// Stable sort by position. Installed elements land after existing ones at equal `at`.
    pub fn flatten(&mut self) {
        self.elements
            .sort_by(|a, b| a.at.partial_cmp(&b.at).unwrap_or(std::cmp::Ordering::Equal));
    }

    pub fn positions(&self) -> Vec<f64> {
        self.elements.iter().map(|e| e.at).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.elements.iter().map(|e| e.name.clone()).collect()
    }

    pub fn element(&self, name: &str) -> Option<&SequenceElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn lattice_path(&self) -> LatticePath {
        LatticePath::new(self.length, self.names(), self.positions())
    }
}

fn engine_err(message: String) -> SpaceChargeError {
    SpaceChargeError::ExternalEngine(message)
}

fn validate_kind(name: &str, kind: &ElementKind) -> SpaceChargeResult<()> {
    let finite = match *kind {
        ElementKind::Marker | ElementKind::Placeholder { .. } => true,
        ElementKind::Quadrupole { k1l } => k1l.is_finite(),
        ElementKind::Sbend { angle } => angle.is_finite(),
        ElementKind::HKicker { kick } | ElementKind::VKicker { kick } => kick.is_finite(),
        ElementKind::RfCavity { volt, freq, lag } => {
            volt.is_finite() && freq.is_finite() && lag.is_finite()
        }
    };
    if !finite {
        return Err(engine_err(format!(
            "element '{name}' ({}) has non-finite parameters",
            kind.keyword()
        )));
    }
    Ok(())
}

pub fn export_lattice_text(seq: &Sequence) -> SpaceChargeResult<String> {
    seq.validate()?;
    let mut out = String::new();
    out.push_str(&format!("format={FORMAT_TAG}\n"));
    out.push_str(&format!("sequence={}\n", seq.name));
    out.push_str(&format!("length={:.16e}\n", seq.length));
    for el in &seq.elements {
        out.push_str(&format!(
            "element,{},{},{:.16e}",
            el.name,
            el.kind.keyword(),
            el.at
        ));
        match el.kind {
            ElementKind::Marker => {}
            ElementKind::Quadrupole { k1l } => out.push_str(&format!(",k1l={k1l:.16e}")),
            ElementKind::Sbend { angle } => out.push_str(&format!(",angle={angle:.16e}")),
            ElementKind::HKicker { kick } | ElementKind::VKicker { kick } => {
                out.push_str(&format!(",kick={kick:.16e}"))
            }
            ElementKind::RfCavity { volt, freq, lag } => out.push_str(&format!(
                ",volt={volt:.16e},freq={freq:.16e},lag={lag:.16e}"
            )),
            ElementKind::Placeholder { slot_id } => out.push_str(&format!(",slot_id={slot_id}")),
        }
        out.push('\n');
    }
    Ok(out)
}

fn parse_float(key: &str, text: &str) -> SpaceChargeResult<f64> {
    let val = text
        .parse::<f64>()
        .map_err(|e| engine_err(format!("failed to parse lattice key '{key}' as float: {e}")))?;
    if !val.is_finite() {
        return Err(engine_err(format!(
            "lattice key '{key}' must be finite, got {val}"
        )));
    }
    Ok(val)
}

/// `key=value` parameters trailing an element line.
struct Params<'a> {
    element: &'a str,
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Params<'a> {
    fn parse(element: &'a str, cols: &[&'a str]) -> SpaceChargeResult<Self> {
        let mut pairs: Vec<(&str, &str)> = Vec::with_capacity(cols.len());
        for &col in cols {
            let (k, v) = col.split_once('=').ok_or_else(|| {
                engine_err(format!(
                    "element '{element}' parameter '{col}' missing '='"
                ))
            })?;
            let k = k.trim();
            if pairs.iter().any(|(seen, _)| *seen == k) {
                return Err(engine_err(format!(
                    "element '{element}' repeats parameter '{k}'"
                )));
            }
            pairs.push((k, v.trim()));
        }
        Ok(Params { element, pairs })
    }

    fn raw(&self, key: &str) -> Option<&'a str> {
        self.pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    fn float(&self, key: &str) -> SpaceChargeResult<f64> {
        let raw = self.raw(key).ok_or_else(|| {
            engine_err(format!(
                "element '{}' missing parameter '{key}'",
                self.element
            ))
        })?;
        parse_float(key, raw)
    }

    fn float_or(&self, key: &str, default: f64) -> SpaceChargeResult<f64> {
        match self.raw(key) {
            Some(raw) => parse_float(key, raw),
            None => Ok(default),
        }
    }

    fn reject_unknown(&self, allowed: &[&str]) -> SpaceChargeResult<()> {
        for (k, _) in &self.pairs {
            if !allowed.contains(k) {
                return Err(engine_err(format!(
                    "element '{}' has unknown parameter '{k}'",
                    self.element
                )));
            }
        }
        Ok(())
    }
}

fn parse_kind(name: &str, keyword: &str, params: &Params<'_>) -> SpaceChargeResult<ElementKind> {
    let kind = match keyword {
        "marker" => {
            params.reject_unknown(&[])?;
            ElementKind::Marker
        }
        "quadrupole" => {
            params.reject_unknown(&["k1l"])?;
            ElementKind::Quadrupole {
                k1l: params.float("k1l")?,
            }
        }
        "sbend" => {
            params.reject_unknown(&["angle"])?;
            ElementKind::Sbend {
                angle: params.float("angle")?,
            }
        }
        "hkicker" => {
            params.reject_unknown(&["kick"])?;
            ElementKind::HKicker {
                kick: params.float_or("kick", 0.0)?,
            }
        }
        "vkicker" => {
            params.reject_unknown(&["kick"])?;
            ElementKind::VKicker {
                kick: params.float_or("kick", 0.0)?,
            }
        }
        "rfcavity" => {
            params.reject_unknown(&["volt", "freq", "lag"])?;
            ElementKind::RfCavity {
                volt: params.float_or("volt", 0.0)?,
                freq: params.float_or("freq", 0.0)?,
                lag: params.float_or("lag", 0.0)?,
            }
        }
        "placeholder" => {
            params.reject_unknown(&["slot_id"])?;
            let slot_id = match params.raw("slot_id") {
                Some(raw) => raw.parse::<u32>().map_err(|e| {
                    engine_err(format!(
                        "element '{name}' slot_id '{raw}' is not an unsigned integer: {e}"
                    ))
                })?,
                None => 0,
            };
            ElementKind::Placeholder { slot_id }
        }
        other => {
            return Err(engine_err(format!(
                "element '{name}' has unsupported kind '{other}'"
            )))
        }
    };
    Ok(kind)
}

pub fn import_lattice_text(text: &str) -> SpaceChargeResult<Sequence> {
    let mut format_seen = false;
    let mut name: Option<String> = None;
    let mut length: Option<f64> = None;
    let mut elements: Vec<SequenceElement> = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("element,") {
            let cols: Vec<&str> = rest.split(',').map(|v| v.trim()).collect();
            if cols.len() < 3 {
                return Err(engine_err(format!(
                    "element line needs at least name, kind and position: {line}"
                )));
            }
            let el_name = cols[0];
            if el_name.is_empty() {
                return Err(engine_err(format!("element line has empty name: {line}")));
            }
            let at = parse_float("element.at", cols[2])?;
            let params = Params::parse(el_name, &cols[3..])?;
            let kind = parse_kind(el_name, cols[1], &params)?;
            elements.push(SequenceElement {
                name: el_name.to_string(),
                kind,
                at,
            });
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| {
            engine_err(format!("invalid lattice line (missing '='): {line}"))
        })?;
        let key = key.trim();
        let value = value.trim();
        match key {
            "format" => {
                if format_seen {
                    return Err(engine_err("duplicate lattice key: format".to_string()));
                }
                if value != FORMAT_TAG {
                    return Err(engine_err(format!("unsupported lattice format: {value}")));
                }
                format_seen = true;
            }
            "sequence" => {
                if name.is_some() {
                    return Err(engine_err("duplicate lattice key: sequence".to_string()));
                }
                name = Some(value.to_string());
            }
            "length" => {
                if length.is_some() {
                    return Err(engine_err("duplicate lattice key: length".to_string()));
                }
                length = Some(parse_float(key, value)?);
            }
            other => {
                return Err(engine_err(format!("unknown lattice key: {other}")));
            }
        }
    }

    if !format_seen {
        return Err(engine_err("missing lattice key: format".to_string()));
    }
    let seq = Sequence {
        name: name.ok_or_else(|| engine_err("missing lattice key: sequence".to_string()))?,
        length: length.ok_or_else(|| engine_err("missing lattice key: length".to_string()))?,
        elements,
    };
    seq.validate()?;
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> &'static str {
        "# ring\n\
         format=sc_lattice_v1\n\
         sequence=ring\n\
         length=20.0\n\
         element,start,marker,0.0\n\
         element,qf,quadrupole,0.0,k1l=0.2\n\
         element,mb,sbend,5.0,angle=0.01\n\
         element,qd,quadrupole,10.0,k1l=-0.2\n\
         element,hk,hkicker,12.0,kick=1e-4\n\
         element,cav,rfcavity,15.0,volt=0.0,freq=200.0,lag=0.0\n\
         element,slot,placeholder,17.0,slot_id=2\n"
    }

    #[test]
    fn test_import_sample() {
        let seq = import_lattice_text(sample_text()).unwrap();
        assert_eq!(seq.name, "ring");
        assert!((seq.length - 20.0).abs() < 1e-12);
        assert_eq!(seq.elements.len(), 7);
        assert_eq!(seq.elements[1].kind, ElementKind::Quadrupole { k1l: 0.2 });
        assert_eq!(seq.elements[6].kind, ElementKind::Placeholder { slot_id: 2 });
        let path = seq.lattice_path();
        assert_eq!(path.positions, vec![0.0, 0.0, 5.0, 10.0, 12.0, 15.0, 17.0]);
        assert!(path.validate().is_ok());
    }

    #[test]
    fn test_export_import_preserves_sequence() {
        let seq = import_lattice_text(sample_text()).unwrap();
        let text = export_lattice_text(&seq).unwrap();
        let back = import_lattice_text(&text).unwrap();
        assert_eq!(seq, back);
    }

    #[test]
    fn test_import_rejects_bad_input() {
        assert!(import_lattice_text("sequence=a\nlength=1.0\n").is_err());
        assert!(import_lattice_text("format=other\nsequence=a\nlength=1.0\n").is_err());
        assert!(import_lattice_text("format=sc_lattice_v1\nlength=1.0\n").is_err());
        assert!(import_lattice_text(
            "format=sc_lattice_v1\nsequence=a\nlength=1.0\nelement,q,quadrupole,0.5\n"
        )
        .is_err());
        assert!(import_lattice_text(
            "format=sc_lattice_v1\nsequence=a\nlength=1.0\nelement,q,octupole,0.5,k3l=1\n"
        )
        .is_err());
        assert!(import_lattice_text(
            "format=sc_lattice_v1\nsequence=a\nlength=1.0\nelement,m,marker,0.5\nelement,m,marker,0.6\n"
        )
        .is_err());
        assert!(import_lattice_text(
            "format=sc_lattice_v1\nsequence=a\nlength=1.0\nelement,m,marker,0.7\nelement,n,marker,0.6\n"
        )
        .is_err());
        assert!(import_lattice_text(
            "format=sc_lattice_v1\nsequence=a\nlength=1.0\nelement,q,quadrupole,0.5,k1l=1,k1l=2\n"
        )
        .is_err());
    }

    #[test]
    fn test_install_and_flatten() {
        let mut seq = import_lattice_text(sample_text()).unwrap();
        seq.install("sc0", 5.0, ElementKind::Placeholder { slot_id: 2 })
            .unwrap();
        seq.install("sc1", 1.0, ElementKind::Placeholder { slot_id: 2 })
            .unwrap();
        seq.flatten();
        assert!(seq.validate().is_ok());
        let names = seq.names();
        let sc1 = names.iter().position(|n| n == "sc1").unwrap();
        let sc0 = names.iter().position(|n| n == "sc0").unwrap();
        let mb = names.iter().position(|n| n == "mb").unwrap();
        assert_eq!(sc1, 2);
        // Same position as the bend: installed element follows it.
        assert_eq!(sc0, mb + 1);
    }

    #[test]
    fn test_install_rejects_duplicates_and_range() {
        let mut seq = import_lattice_text(sample_text()).unwrap();
        assert!(seq
            .install("qf", 3.0, ElementKind::Placeholder { slot_id: 2 })
            .is_err());
        assert!(seq
            .install("far", 25.0, ElementKind::Placeholder { slot_id: 2 })
            .is_err());
        assert!(seq
            .install("nan", f64::NAN, ElementKind::Marker)
            .is_err());
    }
}
