use crate::domain::model::{BilayerSpec, BilayerToken};
use crate::lipids::resolver::LipidConstantResolver;
use crate::utils::error::{ConversionError, Result};

fn describe(tokens: &[BilayerToken]) -> String {
    tokens
        .iter()
        .map(|t| format!("inner={}, outer={}", t.inner, t.outer))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resolves both leaflets of every token and flattens them into specs, in
/// token order.
///
/// A bilayer that cannot be parametrized is an error: numeric defaults are
/// not an acceptable answer once lipid chemistry was asked for.
pub fn build_bilayer_specs(
    tokens: &[BilayerToken],
    resolver: &LipidConstantResolver<'_>,
) -> Result<Vec<BilayerSpec>> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let unavailable = || ConversionError::LipidSourceUnavailable {
        lipids: describe(tokens),
    };
    if !resolver.is_available() {
        return Err(unavailable());
    }

    let mut specs = Vec::with_capacity(tokens.len());
    for token in tokens {
        let inner = resolver.resolve(&token.inner).ok_or_else(unavailable)?;
        let outer = resolver.resolve(&token.outer).ok_or_else(unavailable)?;
        tracing::info!(
            "🧬 Bilayer {}/{}: head {:.1}/{:.1} Å³, tail {:.1}/{:.1} Å³",
            token.inner,
            token.outer,
            inner.head_vol,
            outer.head_vol,
            inner.tail_vol,
            outer.tail_vol
        );
        specs.push(BilayerSpec::from_constants(token, inner, outer));
    }
    Ok(specs)
}
