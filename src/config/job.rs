use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

/// 1枚の写真に対するトレースジョブ。
///
/// `Option` のフィールドは `settings.yaml` の値を上書きする。
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub input: String,
    pub output: String,
    pub markers: Option<String>,
    #[serde(default, deserialize_with = "deserialize_threshold")]
    pub threshold: Option<u8>,
    pub perspective_correction: Option<bool>,
    pub marker_size_mm: Option<f64>,
    pub require_calibration: Option<bool>,
}

/// Parse a threshold value given as an integer in `[0, 255]`.
pub fn parse_threshold(value: i64) -> crate::error::Result<u8> {
    u8::try_from(value).map_err(|_| {
        crate::error::TraceError::config(format!("Threshold must be within 0-255, got {value}"))
    })
}

/// serdeのdeserialize_withで使用する閾値デシリアライザ
fn deserialize_threshold<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<i64>::deserialize(deserializer)?;
    value
        .map(parse_threshold)
        .transpose()
        .map_err(serde::de::Error::custom)
}
