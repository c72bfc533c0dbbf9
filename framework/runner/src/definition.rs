use std::collections::HashSet;
use std::path::{Path, PathBuf};

use gateway_tunnel_core::prelude::ScenarioSpec;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read scenario catalog '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("the scenario catalog defines no scenarios")]
    Empty,
    #[error("scenario '{0}' is defined more than once")]
    DuplicateName(String),
    #[error("scenario '{0}' is required but not defined in the catalog")]
    UnknownScenario(String),
    #[error("scenario '{0}' has an empty query")]
    EmptyQuery(String),
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "scenario")]
    scenarios: Vec<ScenarioSpec>,
}

/// The ordered list of scenarios that a suite runs.
///
/// Loaded from a TOML file of `[[scenario]]` tables:
///
/// ```toml
/// [[scenario]]
/// name = "weather"
/// query = "What is the weather in Oslo tomorrow?"
/// tool_ids = ["weather-forecast"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioCatalog {
    scenarios: Vec<ScenarioSpec>,
}

impl ScenarioCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        if file.scenarios.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut names = HashSet::new();
        for scenario in &file.scenarios {
            if !names.insert(scenario.name.as_str()) {
                return Err(CatalogError::DuplicateName(scenario.name.clone()));
            }
            if scenario.query.trim().is_empty() {
                return Err(CatalogError::EmptyQuery(scenario.name.clone()));
            }
        }

        Ok(Self {
            scenarios: file.scenarios,
        })
    }

    /// Keep only the named scenarios, in catalog order. An empty selection keeps everything.
    pub fn select(self, only: &[String]) -> Result<Self, CatalogError> {
        if only.is_empty() {
            return Ok(self);
        }

        if let Some(unknown) = only
            .iter()
            .find(|name| !self.scenarios.iter().any(|s| &s.name == *name))
        {
            return Err(CatalogError::UnknownScenario(unknown.clone()));
        }

        Ok(Self {
            scenarios: self
                .scenarios
                .into_iter()
                .filter(|s| only.contains(&s.name))
                .collect(),
        })
    }

    pub fn scenarios(&self) -> &[ScenarioSpec] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        [[scenario]]
        name = "weather"
        query = "What is the weather in Oslo tomorrow?"
        tool_ids = ["weather-forecast"]

        [[scenario]]
        name = "small-talk"
        query = "Tell me a joke"

        [[scenario]]
        name = "stocks"
        query = "How did the index close today?"
        tool_ids = ["market-data", "calculator"]
    "#;

    #[test]
    fn parses_scenarios_in_order() {
        let catalog = ScenarioCatalog::from_toml_str(CATALOG).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.scenarios()[0].tool_ids, vec!["weather-forecast"]);
        assert!(catalog.scenarios()[1].tool_ids.is_empty());
        assert_eq!(catalog.scenarios()[2].name, "stocks");
    }

    #[test]
    fn selection_keeps_catalog_order() {
        let catalog = ScenarioCatalog::from_toml_str(CATALOG)
            .unwrap()
            .select(&["stocks".to_string(), "weather".to_string()])
            .unwrap();

        let names = catalog
            .scenarios()
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["weather", "stocks"]);
    }

    #[test]
    fn unknown_selection_is_an_error() {
        let err = ScenarioCatalog::from_toml_str(CATALOG)
            .unwrap()
            .select(&["missing".to_string()])
            .unwrap_err();

        assert!(matches!(err, CatalogError::UnknownScenario(name) if name == "missing"));
    }

    #[test]
    fn rejects_invalid_catalogs() {
        assert!(matches!(
            ScenarioCatalog::from_toml_str(""),
            Err(CatalogError::Empty)
        ));
        assert!(matches!(
            ScenarioCatalog::from_toml_str(
                "[[scenario]]\nname = \"a\"\nquery = \"q\"\n[[scenario]]\nname = \"a\"\nquery = \"q\"\n"
            ),
            Err(CatalogError::DuplicateName(_))
        ));
        assert!(matches!(
            ScenarioCatalog::from_toml_str("[[scenario]]\nname = \"a\"\nquery = \" \"\n"),
            Err(CatalogError::EmptyQuery(_))
        ));
        assert!(matches!(
            ScenarioCatalog::from_toml_str("[[scenario]]\nname = \"a\"\n"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ScenarioCatalog::load(Path::new("/non/existent/scenarios.toml")).unwrap_err();

        assert!(matches!(err, CatalogError::Read { .. }));
    }
}
