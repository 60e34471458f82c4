use crate::domain::model::BilayerToken;
use crate::orso::model_language::SampleModel;
use regex::Regex;
use std::sync::LazyLock;

static BILAYER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^bilayer\s*\(\s*inner\s*=\s*([A-Za-z0-9_]+)\s*,\s*outer\s*=\s*([A-Za-z0-9_]+)\s*\)\s*$",
    )
    .unwrap()
});

/// Removes `bilayer(inner=…, outer=…)` tokens from a `|`-separated stack.
///
/// Returns the rewritten stack and the tokens found, in stack order. When
/// no token matches, the stack comes back byte-for-byte unchanged.
pub fn strip_bilayer_tokens(stack: &str) -> (String, Vec<BilayerToken>) {
    let mut bilayers = Vec::new();
    let mut kept = Vec::new();

    for token in stack.split('|').map(str::trim) {
        match BILAYER_TOKEN.captures(token) {
            Some(caps) => bilayers.push(BilayerToken {
                inner: caps[1].to_string(),
                outer: caps[2].to_string(),
            }),
            None => kept.push(token),
        }
    }

    if bilayers.is_empty() {
        return (stack.to_string(), bilayers);
    }
    (kept.join(" | "), bilayers)
}

/// Strips bilayer tokens from `model.stack` in place so the remaining stack
/// only contains items the sample-model resolver understands.
pub fn extract_bilayers(model: &mut SampleModel) -> Vec<BilayerToken> {
    let (stack, bilayers) = strip_bilayer_tokens(&model.stack);
    if !bilayers.is_empty() {
        tracing::debug!(
            "Stripped {} bilayer token(s); stack is now '{}'",
            bilayers.len(),
            stack
        );
        model.stack = stack;
    }
    bilayers
}
