//! Configuration: the static ontology (JSON) and runtime tuning (TOML).
//!
//! Both are loaded once at startup and then shared by `Arc`; nothing here is
//! global or mutable after construction.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fr::summary::SummaryConfig;
use crate::fr::{BuildConfig, FrDefinition, normalize_all};
use crate::graph::{FundamentalCategory, PropertyHierarchy, local_name};
use crate::retrieve::adjacency::AdjacencyConfig;
use crate::retrieve::fusion::FusionConfig;
use crate::retrieve::ranker::RankingConfig;

pub const RELATIONSHIPS_FILE: &str = "fundamental_relationships.json";
pub const INVERSES_FILE: &str = "inverse_properties.json";
pub const CLASS_MAPPING_FILE: &str = "fc_class_mapping.json";
/// Optional; absent means every predicate is its own family.
pub const HIERARCHY_FILE: &str = "property_hierarchy.json";

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn local_names(map: HashMap<String, Vec<String>>) -> HashMap<String, Vec<String>> {
    map.into_iter()
        .map(|(k, v)| {
            (
                local_name(&k).to_string(),
                v.iter().map(|c| local_name(c).to_string()).collect(),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Ontology
// ---------------------------------------------------------------------------

/// The category an entity's types resolve to, with the class that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcMatch {
    pub category: FundamentalCategory,
    pub class: String,
}

/// FR definitions, property hierarchy and class → category mapping.
#[derive(Debug, Clone)]
pub struct OntologyConfig {
    relationships: Vec<FrDefinition>,
    hierarchy: PropertyHierarchy,
    class_categories: HashMap<String, FundamentalCategory>,
    category_classes: BTreeMap<FundamentalCategory, Vec<String>>,
}

impl OntologyConfig {
    /// Validate and assemble. `class_mapping` is keyed by category name;
    /// property and class names may be full URIs.
    pub fn new(
        relationships: Vec<FrDefinition>,
        inverses: HashMap<String, String>,
        class_mapping: HashMap<String, Vec<String>>,
        sub_properties: HashMap<String, Vec<String>>,
    ) -> Result<Self, ConfigError> {
        let relationships = normalize_all(relationships)?;

        let mut class_categories: HashMap<String, FundamentalCategory> = HashMap::new();
        let mut category_classes: BTreeMap<FundamentalCategory, Vec<String>> = BTreeMap::new();
        for (name, classes) in local_names(class_mapping) {
            let category: FundamentalCategory = name.parse()?;
            for class in classes {
                // A class listed under two categories keeps the stronger one.
                let slot = class_categories.entry(class.clone()).or_insert(category);
                if category.priority() > slot.priority() {
                    *slot = category;
                }
                category_classes.entry(category).or_default().push(class);
            }
        }
        for classes in category_classes.values_mut() {
            classes.sort();
            classes.dedup();
        }

        let inverses: HashMap<String, String> = inverses
            .into_iter()
            .map(|(p, q)| (local_name(&p).to_string(), local_name(&q).to_string()))
            .collect();
        let hierarchy = PropertyHierarchy::new(&local_names(sub_properties), &inverses);

        Ok(Self {
            relationships,
            hierarchy,
            class_categories,
            category_classes,
        })
    }

    /// Load the ontology files from a directory.
    pub fn load_dir(dir: &Path) -> Result<Self, ConfigError> {
        let relationships: Vec<FrDefinition> = read_json(&dir.join(RELATIONSHIPS_FILE))?;
        let inverses: HashMap<String, String> = read_json(&dir.join(INVERSES_FILE))?;
        let class_mapping: HashMap<String, Vec<String>> = read_json(&dir.join(CLASS_MAPPING_FILE))?;
        let hierarchy_path = dir.join(HIERARCHY_FILE);
        let sub_properties = if hierarchy_path.exists() {
            read_json(&hierarchy_path)?
        } else {
            HashMap::new()
        };
        let config = Self::new(relationships, inverses, class_mapping, sub_properties)?;
        tracing::info!(
            dir = %dir.display(),
            relationships = config.relationships.len(),
            classes = config.class_categories.len(),
            "loaded ontology configuration"
        );
        Ok(config)
    }

    /// FR definitions in configuration order.
    pub fn relationships(&self) -> &[FrDefinition] {
        &self.relationships
    }

    pub fn relationship(&self, id: &str) -> Option<&FrDefinition> {
        self.relationships.iter().find(|d| d.id == id)
    }

    pub fn hierarchy(&self) -> &PropertyHierarchy {
        &self.hierarchy
    }

    /// Category of the highest-priority type, independent of input order.
    ///
    /// Among equally strong classes, the lexicographically smallest decides.
    pub fn get_fc<S: AsRef<str>>(&self, types: &[S]) -> Option<FcMatch> {
        types
            .iter()
            .filter_map(|t| {
                let name = local_name(t.as_ref());
                self.class_categories.get(name).map(|&c| (c, name))
            })
            .max_by(|a, b| a.0.priority().cmp(&b.0.priority()).then_with(|| b.1.cmp(a.1)))
            .map(|(category, class)| FcMatch {
                category,
                class: class.to_string(),
            })
    }

    /// Every category any of `types` maps to, in category order.
    pub fn categories_of<S: AsRef<str>>(&self, types: &[S]) -> Vec<FundamentalCategory> {
        self.category_classes
            .iter()
            .filter(|(_, classes)| {
                types
                    .iter()
                    .any(|t| classes.binary_search_by(|c| c.as_str().cmp(local_name(t.as_ref()))).is_ok())
            })
            .map(|(&category, _)| category)
            .collect()
    }

    /// Classes mapped to a category, sorted.
    pub fn classes_for(&self, category: FundamentalCategory) -> &[String] {
        self.category_classes
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Runtime tuning
// ---------------------------------------------------------------------------

/// Contents of `retrieval.toml`. Every section and field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub build: BuildConfig,
    pub adjacency: AdjacencyConfig,
    pub ranking: RankingConfig,
    pub fusion: FusionConfig,
    pub summary: SummaryConfig,
}

impl RetrievalConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Reject values the algorithms cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };
        let damping = self.build.pagerank.damping;
        if !(damping > 0.0 && damping < 1.0) {
            return invalid("build.pagerank.damping must be in (0, 1)");
        }
        if self.adjacency.max_hops == 0 {
            return invalid("adjacency.max_hops must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.ranking.alpha) {
            return invalid("ranking.alpha must be in [0, 1]");
        }
        if self.fusion.pool_size == 0 {
            return invalid("fusion.pool_size must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.summary.overlap_threshold) {
            return invalid("summary.overlap_threshold must be in [0, 1]");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fr::{PropertyPath, Step};

    fn classes() -> HashMap<String, Vec<String>> {
        HashMap::from([
            ("Actor".to_string(), vec!["E21_Person".to_string(), "E74_Group".to_string()]),
            ("Place".to_string(), vec!["http://www.cidoc-crm.org/cidoc-crm/E53_Place".to_string()]),
            ("Thing".to_string(), vec!["E22_Human-Made_Object".to_string()]),
            ("Event".to_string(), vec!["E5_Event".to_string()]),
        ])
    }

    fn ontology() -> OntologyConfig {
        OntologyConfig::new(Vec::new(), HashMap::new(), classes(), HashMap::new()).unwrap()
    }

    #[test]
    fn get_fc_prefers_strongest_type() {
        let config = ontology();
        let a = ["E22_Human-Made_Object", "E53_Place", "E21_Person"];
        let b = ["E21_Person", "E53_Place", "E22_Human-Made_Object"];
        let expected = Some(FcMatch {
            category: FundamentalCategory::Actor,
            class: "E21_Person".into(),
        });
        assert_eq!(config.get_fc(&a), expected);
        assert_eq!(config.get_fc(&b), expected);
        assert_eq!(config.get_fc(&["E55_Type"]), None);
        let empty: [&str; 0] = [];
        assert_eq!(config.get_fc(&empty), None);
    }

    #[test]
    fn get_fc_accepts_full_uris() {
        let config = ontology();
        let m = config
            .get_fc(&["http://www.cidoc-crm.org/cidoc-crm/E53_Place"])
            .unwrap();
        assert_eq!(m.category, FundamentalCategory::Place);
        assert_eq!(config.classes_for(FundamentalCategory::Actor).len(), 2);
        assert!(config.classes_for(FundamentalCategory::Time).is_empty());
    }

    #[test]
    fn categories_of_keeps_every_match() {
        let config = ontology();
        assert_eq!(
            config.categories_of(&["E53_Place", "E55_Type", "http://x.org/E21_Person"]),
            vec![FundamentalCategory::Actor, FundamentalCategory::Place]
        );
        let empty: [&str; 0] = [];
        assert!(config.categories_of(&empty).is_empty());
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mapping = HashMap::from([("Animal".to_string(), vec!["E1".to_string()])]);
        let err = OntologyConfig::new(Vec::new(), HashMap::new(), mapping, HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCategory { .. }));
    }

    #[test]
    fn inverses_and_families_use_local_names() {
        let fr = FrDefinition::new(
            "place_in_place",
            "",
            FundamentalCategory::Place,
            Some(FundamentalCategory::Place),
            vec![PropertyPath::new("p", vec![Step::new("P89_falls_within", true)])],
        );
        let inverses = HashMap::from([(
            "http://www.cidoc-crm.org/cidoc-crm/P89_falls_within".to_string(),
            "P89i_contains".to_string(),
        )]);
        let config = OntologyConfig::new(vec![fr], inverses, classes(), HashMap::new()).unwrap();
        assert_eq!(config.hierarchy().inverse_of("P89i_contains"), Some("P89_falls_within"));
        assert_eq!(config.relationship("place_in_place").unwrap().label, "place in place");
    }

    #[test]
    fn runtime_config_round_trips_through_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("retrieval.toml");
        let mut config = RetrievalConfig::default();
        config.ranking.alpha = 0.6;
        config.adjacency.weights.insert("P2_has_type".into(), 0.2);
        config.save(&path).unwrap();
        let loaded = RetrievalConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: RetrievalConfig = toml::from_str("[ranking]\nalpha = 0.5\n").unwrap();
        assert_eq!(config.ranking.alpha, 0.5);
        assert_eq!(config.fusion.rrf_k, 60.0);
        assert_eq!(config.adjacency.max_hops, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = RetrievalConfig::default();
        config.ranking.alpha = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }
}
