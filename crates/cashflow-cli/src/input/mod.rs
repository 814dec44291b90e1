pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use std::path::Path;

/// Encodings accepted for assumption and scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Yaml,
}

impl InputFormat {
    /// `.yaml`/`.yml` files are YAML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => InputFormat::Yaml,
            _ => InputFormat::Json,
        }
    }

    /// Piped text has no extension: a leading `{` means JSON.
    pub fn sniff(text: &str) -> Self {
        if text.trim_start().starts_with('{') {
            InputFormat::Json
        } else {
            InputFormat::Yaml
        }
    }

    pub fn parse<T: DeserializeOwned>(
        self,
        text: &str,
        source: &str,
    ) -> Result<T, Box<dyn std::error::Error>> {
        let parsed = match self {
            InputFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            InputFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| format!("Failed to parse {source}: {e}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashflow_core::CashFlowAssumptions;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.yml")), InputFormat::Yaml);
        assert_eq!(InputFormat::from_path(Path::new("a.yaml")), InputFormat::Yaml);
        assert_eq!(InputFormat::from_path(Path::new("a.json")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("a")), InputFormat::Json);
    }

    #[test]
    fn test_piped_yaml_is_recognised() {
        let json = serde_json::to_string(&CashFlowAssumptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let yaml = serde_yaml::to_string(&value).unwrap();

        assert_eq!(InputFormat::sniff(&json), InputFormat::Json);
        assert_eq!(InputFormat::sniff(&yaml), InputFormat::Yaml);
        let parsed: CashFlowAssumptions = InputFormat::sniff(&yaml).parse(&yaml, "stdin").unwrap();
        assert_eq!(parsed, CashFlowAssumptions::default());
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = InputFormat::Json
            .parse::<CashFlowAssumptions>("{", "venture.json")
            .unwrap_err();
        assert!(err.to_string().contains("venture.json"));
    }
}
