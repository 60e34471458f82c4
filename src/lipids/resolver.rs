use crate::domain::model::LipidConstants;
use crate::domain::ports::LipidPropertySource;
use crate::lipids::table::LipidEntry;

/// Typical phosphocholine headgroup volume (Å³).
pub const DEFAULT_HEAD_VOLUME: f64 = 330.0;
/// Two C16 chains, roughly (Å³).
pub const DEFAULT_TAIL_VOLUME: f64 = 800.0;
/// fm → Å, so that `nsl * NSL_TO_ANGSTROM / volume` is in Å⁻².
pub const NSL_TO_ANGSTROM: f64 = 1e-5;
pub const DEFAULT_REFERENCE_LIPID: &str = "DPPC";

pub fn scattering_length_density(nsl: f64, volume: f64) -> f64 {
    if volume > 0.0 && nsl != 0.0 {
        nsl * NSL_TO_ANGSTROM / volume
    } else {
        0.0
    }
}

/// Turns lipid identifiers into head/tail constants.
///
/// The property source may be absent; `resolve` then returns `None` and the
/// caller decides whether that is fatal. With a source present every field
/// of the result is populated, falling back to the reference lipid for
/// unknown identifiers and to fixed volumes for missing geometry.
pub struct LipidConstantResolver<'a> {
    source: Option<&'a dyn LipidPropertySource>,
    reference_lipid: String,
}

impl<'a> LipidConstantResolver<'a> {
    pub fn new(source: Option<&'a dyn LipidPropertySource>) -> Self {
        Self {
            source,
            reference_lipid: DEFAULT_REFERENCE_LIPID.to_string(),
        }
    }

    pub fn with_reference_lipid(mut self, lipid_id: &str) -> Self {
        self.reference_lipid = lipid_id.to_string();
        self
    }

    pub fn is_available(&self) -> bool {
        self.source.is_some()
    }

    pub fn resolve(&self, lipid_id: &str) -> Option<LipidConstants> {
        let source = self.source?;

        let empty = LipidEntry::default();
        let entry = match source.lookup(lipid_id) {
            Some(entry) => entry,
            None => {
                tracing::warn!(
                    "⚠ Unknown lipid '{}', using {} as a generic phospholipid",
                    lipid_id,
                    self.reference_lipid
                );
                source.lookup(&self.reference_lipid).unwrap_or(&empty)
            }
        };

        Some(constants_from_entry(lipid_id, entry))
    }
}

fn constants_from_entry(lipid_id: &str, entry: &LipidEntry) -> LipidConstants {
    let (mut head_vol, head_nsl) = match &entry.headgroup {
        Some(head) if !head.components.is_empty() => (
            head.components.iter().map(|c| c.volume()).sum::<f64>(),
            head.components
                .iter()
                .map(|c| c.scattering_length())
                .sum::<f64>(),
        ),
        _ => (0.0, 0.0),
    };

    if head_vol <= 0.0 {
        head_vol = entry.headgroup_volume.unwrap_or(0.0);
    }
    if head_vol <= 0.0 {
        tracing::debug!(
            "{}: no headgroup volume, using {} Å³",
            lipid_id,
            DEFAULT_HEAD_VOLUME
        );
        head_vol = DEFAULT_HEAD_VOLUME;
    }

    let (mut tail_vol, tail_nsl) = match &entry.tails {
        Some(tails) => (tails.volume(), tails.scattering_length()),
        None => (0.0, 0.0),
    };
    if tail_vol <= 0.0 {
        tracing::debug!(
            "{}: no tail volume, using {} Å³",
            lipid_id,
            DEFAULT_TAIL_VOLUME
        );
        tail_vol = DEFAULT_TAIL_VOLUME;
    }

    LipidConstants {
        head_vol,
        head_sld: scattering_length_density(head_nsl, head_vol),
        tail_vol,
        tail_sld: scattering_length_density(tail_nsl, tail_vol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lipids::table::LipidTable;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * b.abs().max(1e-30)
    }

    #[test]
    fn test_unavailable_source_returns_none() {
        let resolver = LipidConstantResolver::new(None);
        assert!(!resolver.is_available());
        assert!(resolver.resolve("DPPC").is_none());
    }

    #[test]
    fn test_dppc_from_components() {
        let table = LipidTable::bundled().unwrap();
        let resolver = LipidConstantResolver::new(Some(&table));
        let dppc = resolver.resolve("DPPC").unwrap();

        assert_eq!(dppc.head_vol, 321.0);
        assert!(close(dppc.head_sld, (37.747 + 28.342 - 6.017) * 1e-5 / 321.0));
        assert_eq!(dppc.tail_vol, 782.0);
        assert!(close(dppc.tail_sld, -32.438 * 1e-5 / 782.0));
        assert!(dppc.tail_sld < 0.0);
    }

    #[test]
    fn test_unknown_lipid_falls_back_to_reference() {
        let table = LipidTable::bundled().unwrap();
        let resolver = LipidConstantResolver::new(Some(&table));
        let unknown = resolver.resolve("NOT_A_LIPID").unwrap();
        let dppc = resolver.resolve("DPPC").unwrap();
        assert_eq!(unknown, dppc);
        for value in [unknown.head_vol, unknown.head_sld, unknown.tail_vol, unknown.tail_sld] {
            assert!(value.is_finite());
        }
    }

    #[test]
    fn test_headgroup_volume_attribute_fallback() {
        let table = LipidTable::bundled().unwrap();
        let resolver = LipidConstantResolver::new(Some(&table));
        let popg = resolver.resolve("POPG").unwrap();
        assert_eq!(popg.head_vol, 322.0);
        // no component nsl, so no head SLD
        assert_eq!(popg.head_sld, 0.0);
    }

    #[test]
    fn test_fixed_head_volume_fallback() {
        let table = LipidTable::bundled().unwrap();
        let resolver = LipidConstantResolver::new(Some(&table));
        let dopg = resolver.resolve("DOPG").unwrap();
        assert_eq!(dopg.head_vol, DEFAULT_HEAD_VOLUME);
        assert_eq!(dopg.head_sld, 0.0);
        assert_eq!(dopg.tail_vol, 972.0);
    }

    #[test]
    fn test_missing_reference_uses_numeric_defaults() {
        let table = LipidTable::from_toml_str("tiny", "[XYZ]\nheadgroup_volume = 100.0\n").unwrap();
        let resolver = LipidConstantResolver::new(Some(&table));
        let constants = resolver.resolve("DPPC").unwrap();
        assert_eq!(constants.head_vol, DEFAULT_HEAD_VOLUME);
        assert_eq!(constants.tail_vol, DEFAULT_TAIL_VOLUME);
        assert_eq!(constants.head_sld, 0.0);
        assert_eq!(constants.tail_sld, 0.0);
    }

    #[test]
    fn test_zero_component_volume_keeps_nsl() {
        let table = LipidTable::from_toml_str(
            "odd",
            r#"
[ODD]
headgroup_volume = 300.0
[[ODD.headgroup.components]]
cell_volume = 0.0
nsl = [30.0, 30.0]
[ODD.tails]
nsl = -20.0
"#,
        )
        .unwrap();
        let resolver = LipidConstantResolver::new(Some(&table));
        let odd = resolver.resolve("ODD").unwrap();
        assert_eq!(odd.head_vol, 300.0);
        assert!(close(odd.head_sld, 60.0 * 1e-5 / 300.0));
        assert_eq!(odd.tail_vol, DEFAULT_TAIL_VOLUME);
        assert!(close(odd.tail_sld, -20.0 * 1e-5 / 800.0));
    }

    #[test]
    fn test_sld_conversion() {
        assert_eq!(scattering_length_density(0.0, 300.0), 0.0);
        assert_eq!(scattering_length_density(10.0, 0.0), 0.0);
        assert!(close(scattering_length_density(60.0, 300.0), 2e-6));
    }
}
