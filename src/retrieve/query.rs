//! Question cue words → target fundamental categories.

use crate::graph::FundamentalCategory;

const CUES: &[(&str, &[FundamentalCategory])] = {
    use FundamentalCategory::*;
    &[
        ("who", &[Actor]),
        ("whom", &[Actor]),
        ("whose", &[Actor]),
        ("person", &[Actor]),
        ("people", &[Actor]),
        ("artist", &[Actor]),
        ("maker", &[Actor]),
        ("sculptor", &[Actor]),
        ("painter", &[Actor]),
        ("owner", &[Actor]),
        ("where", &[Place]),
        ("place", &[Place]),
        ("located", &[Place]),
        ("location", &[Place]),
        ("site", &[Place]),
        ("city", &[Place]),
        ("region", &[Place]),
        ("found", &[Place, Event]),
        ("when", &[Time, Event]),
        ("date", &[Time]),
        ("dated", &[Time]),
        ("year", &[Time]),
        ("century", &[Time]),
        ("period", &[Time]),
        ("event", &[Event]),
        ("happened", &[Event]),
        ("excavation", &[Event]),
        ("excavated", &[Event]),
        ("production", &[Event]),
        ("produced", &[Event]),
        ("created", &[Event]),
        ("type", &[Concept]),
        ("kind", &[Concept]),
        ("material", &[Concept]),
        ("technique", &[Concept]),
        ("style", &[Concept]),
        ("object", &[Thing]),
        ("objects", &[Thing]),
        ("artifact", &[Thing]),
        ("artefact", &[Thing]),
        ("statue", &[Thing]),
        ("vase", &[Thing]),
        ("made", &[Thing, Event]),
    ]
};

/// Target categories cued by the question, in category order, deduplicated.
pub fn infer_categories(question: &str) -> Vec<FundamentalCategory> {
    let lowered = question.to_lowercase();
    let mut found: Vec<FundamentalCategory> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter_map(|w| CUES.iter().find(|(cue, _)| *cue == w))
        .flat_map(|(_, categories)| categories.iter().copied())
        .collect();
    found.sort();
    found.dedup();
    found
}
