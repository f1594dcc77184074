use psmseek::SearchParameters;
use serde::{
    Deserialize,
    Serialize,
};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub analysis: SearchParameters,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum InputConfig {
    /// Search results to merge and re-score.
    #[serde(rename = "tab_delimited")]
    TabDelimited { paths: Vec<PathBuf> },
    /// Byte offsets of a range of scans in an ms2 spectrum file.
    #[serde(rename = "scan_lookup")]
    ScanLookup { path: PathBuf, scans: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tab_delimited_config() {
        let conf: Config = serde_json::from_str(
            r#"{
                "input": {"type": "tab_delimited", "paths": ["a.txt", "b.txt"]},
                "analysis": {"decoy_prefix": "rev_"},
                "output": {"directory": "out"}
            }"#,
        )
        .unwrap();
        match conf.input {
            Some(InputConfig::TabDelimited { paths }) => assert_eq!(paths.len(), 2),
            other => panic!("unexpected input {:?}", other),
        }
        assert_eq!(conf.analysis.decoy_prefix, "rev_");
        assert_eq!(conf.analysis.min_weibull_points, 40);
    }

    #[test]
    fn test_parse_scan_lookup_without_analysis() {
        let conf: Config = serde_json::from_str(
            r#"{"input": {"type": "scan_lookup", "path": "run.ms2", "scans": "10-20"}}"#,
        )
        .unwrap();
        assert!(matches!(conf.input, Some(InputConfig::ScanLookup { .. })));
        assert!(conf.output.is_none());
        assert_eq!(conf.analysis.decoy_prefix, "decoy_");
    }
}
