use crate::orso::model_language::SampleModel;
use serde::Deserialize;

/// The parts of an ORSO header the converter reads. Everything else in the
/// header is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrsoHeader {
    #[serde(default)]
    pub data_set: Option<serde_yaml::Value>,
    #[serde(default)]
    pub data_source: Option<DataSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataSource {
    #[serde(default)]
    pub sample: Option<Sample>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<SampleModel>,
}

/// Recursively overlays `overlay` onto `base`: mappings merge key by key,
/// any other value replaces. A null overlay keeps the base.
pub fn merge_headers(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    use serde_yaml::Value;

    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_headers(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
