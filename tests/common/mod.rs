//! Shared fixture: a small CIDOC-CRM dataset and ontology directory.
//!
//! Two sculptures and a vase produced by Pheidias in Athens, a frieze kept
//! on the Acropolis, and a place hierarchy Acropolis ⊂ Athens ⊂ Attica.
//! The vase's production is recorded from the event's side
//! (`P108_has_produced`), and the makers are linked with `P14_carried_out_by`
//! while the FR asks for its super-property `P11_had_participant`.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use crm_retrieval::engine::Engine;
use crm_retrieval::sources::JsonlTripleSource;

pub const CRM: &str = "http://www.cidoc-crm.org/cidoc-crm/";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

const RELATIONSHIPS: &str = r#"[
  {
    "id": "place_in_place",
    "label": "is located in",
    "domain_fc": "Place",
    "range_fc": "Place",
    "paths": [
      {"id": "pp1", "steps": [{"property": "P89_falls_within", "recursive": true}]}
    ]
  },
  {
    "id": "thing_made_by",
    "label": "was made by",
    "domain_fc": "Thing",
    "range_fc": "Actor",
    "paths": [
      {"id": "tm1", "steps": [
        {"property": "P108i_was_produced_by"},
        {"property": "P11_had_participant"}
      ]}
    ]
  },
  {
    "id": "thing_from_place",
    "label": "is from",
    "domain_fc": "Thing",
    "range_fc": "Place",
    "paths": [
      {"id": "tp1", "steps": [
        {"property": "P108i_was_produced_by"},
        {"property": "P7_took_place_at"},
        {"property": "P89_falls_within", "recursive": true}
      ]},
      {"id": "tp2", "steps": [
        {"property": "P53_has_former_or_current_location"},
        {"property": "P89_falls_within", "recursive": true}
      ]}
    ]
  }
]"#;

const INVERSES: &str = r#"{
  "P108i_was_produced_by": "P108_has_produced",
  "P89_falls_within": "P89i_contains",
  "P14_carried_out_by": "P14i_performed",
  "P7_took_place_at": "P7i_witnessed"
}"#;

const CLASSES: &str = r#"{
  "Actor": ["E21_Person", "E39_Actor"],
  "Place": ["E53_Place"],
  "Event": ["E12_Production", "E5_Event"],
  "Thing": ["E22_Human-Made_Object"],
  "Concept": ["E55_Type"],
  "Time": ["E52_Time-Span"]
}"#;

const HIERARCHY: &str = r#"{
  "P11_had_participant": ["P14_carried_out_by"]
}"#;

/// Write the ontology files into `dir/ontology` and return that path.
pub fn write_ontology(dir: &Path) -> PathBuf {
    let ontology = dir.join("ontology");
    fs::create_dir_all(&ontology).unwrap();
    fs::write(ontology.join("fundamental_relationships.json"), RELATIONSHIPS).unwrap();
    fs::write(ontology.join("inverse_properties.json"), INVERSES).unwrap();
    fs::write(ontology.join("fc_class_mapping.json"), CLASSES).unwrap();
    fs::write(ontology.join("property_hierarchy.json"), HIERARCHY).unwrap();
    ontology
}

fn line(s: &str, p: &str, o: &str, s_label: Option<&str>, o_label: Option<&str>) -> String {
    serde_json::json!({
        "subject": s,
        "subject_label": s_label,
        "predicate": p,
        "object": o,
        "object_label": o_label,
    })
    .to_string()
}

fn typed(uri: &str, class: &str, label: &str) -> String {
    line(uri, RDF_TYPE, &format!("{CRM}{class}"), Some(label), None)
}

fn rel(s: &str, p: &str, o: &str) -> String {
    line(s, &format!("{CRM}{p}"), o, None, None)
}

/// Write the dataset as JSON Lines and return its path.
pub fn write_triples(dir: &Path) -> PathBuf {
    let lines = [
        typed("urn:vase", "E22_Human-Made_Object", "Red-figure vase"),
        typed("urn:sculpture", "E22_Human-Made_Object", "Athena Parthenos"),
        typed("urn:frieze", "E22_Human-Made_Object", "Parthenon frieze"),
        typed("urn:prod1", "E12_Production", "Production of the vase"),
        typed("urn:prod2", "E12_Production", "Production of the Athena"),
        typed("urn:pheidias", "E21_Person", "Pheidias"),
        typed("urn:athens", "E53_Place", "Athens"),
        typed("urn:attica", "E53_Place", "Attica"),
        typed("urn:acropolis", "E53_Place", "Acropolis"),
        rel("urn:prod1", "P108_has_produced", "urn:vase"),
        rel("urn:prod1", "P14_carried_out_by", "urn:pheidias"),
        rel("urn:prod1", "P7_took_place_at", "urn:athens"),
        rel("urn:sculpture", "P108i_was_produced_by", "urn:prod2"),
        rel("urn:prod2", "P14_carried_out_by", "urn:pheidias"),
        rel("urn:prod2", "P7_took_place_at", "urn:athens"),
        rel("urn:frieze", "P53_has_former_or_current_location", "urn:acropolis"),
        rel("urn:athens", "P89_falls_within", "urn:attica"),
        rel("urn:acropolis", "P89_falls_within", "urn:athens"),
        "# trailing comment".to_string(),
    ];
    let path = dir.join("triples.jsonl");
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

/// Engine with the fixture ontology and the fixture dataset built and published.
pub fn built_engine(dir: &Path) -> Engine {
    let ontology = write_ontology(dir);
    let triples = write_triples(dir);
    let engine = Engine::open(&ontology, None).unwrap();
    let mut source = JsonlTripleSource::open(&triples, 4).unwrap();
    engine.build(&mut source, None).unwrap();
    engine
}

/// Ranked list file: JSON array of {"id", "score"}.
pub fn write_ranked(dir: &Path, name: &str, ids: &[&str]) -> PathBuf {
    let hits: Vec<serde_json::Value> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| serde_json::json!({"id": id, "score": 1.0 / (i as f64 + 1.0)}))
        .collect();
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string(&hits).unwrap()).unwrap();
    path
}
