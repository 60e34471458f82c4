/// Neutron SLDs (Å⁻²) of media that commonly appear in stacks without a
/// `materials` entry.
const KNOWN_MEDIA: &[(&str, f64)] = &[
    ("air", 0.0),
    ("vacuum", 0.0),
    ("Si", 2.07e-6),
    ("SiO2", 3.47e-6),
    ("D2O", 6.36e-6),
    ("H2O", -0.56e-6),
    ("Al2O3", 5.75e-6),
    ("Au", 4.5e-6),
    ("Ag", 3.5e-6),
    ("Cr", 3.03e-6),
    ("Cu", 6.55e-6),
    ("Fe", 8.02e-6),
    ("Ni", 9.41e-6),
    ("Pt", 6.29e-6),
    ("Ti", -1.95e-6),
];

/// Exact formula match first, then case-insensitive.
pub fn known_sld(formula: &str) -> Option<f64> {
    let formula = formula.trim();
    KNOWN_MEDIA
        .iter()
        .find(|(name, _)| *name == formula)
        .or_else(|| {
            KNOWN_MEDIA
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(formula))
        })
        .map(|(_, sld)| *sld)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sld_lookup() {
        assert_eq!(known_sld("D2O"), Some(6.36e-6));
        assert_eq!(known_sld("Air"), Some(0.0));
        assert_eq!(known_sld(" si "), Some(2.07e-6));
        assert_eq!(known_sld("Unobtainium"), None);
    }
}
