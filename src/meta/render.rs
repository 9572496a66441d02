use serde::Serialize;
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;

use super::collector::MetaData;
use super::stats::RelTypeStats;
use super::LabelStats;
use crate::models::{EntityKind, MetaItem, MetaType, Value};

/// One row of the `meta data` report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaRow {
    pub label: String,
    pub property: String,
    pub count: u64,
    pub unique: bool,
    pub index: bool,
    pub existence: bool,
    #[serde(rename = "type")]
    pub type_name: String,
    pub array: bool,
    pub sample: Vec<Value>,
    pub left: u64,
    pub right: u64,
    pub other: Vec<String>,
    pub other_labels: Vec<String>,
    pub element_type: EntityKind,
}

impl MetaRow {
    fn from_item(item: &MetaItem, other_labels: Vec<String>) -> Self {
        Self {
            label: item.label.clone(),
            property: item.key.clone(),
            count: item.count,
            unique: item.unique,
            index: item.index,
            existence: item.existence,
            type_name: item.type_name.name().to_string(),
            array: item.array,
            sample: item.sample.clone(),
            left: item.left,
            right: item.right,
            other: item.other.iter().cloned().collect(),
            other_labels,
            element_type: item.element_type,
        }
    }
}

impl MetaData {
    /// Flat report: every item of the label sections, and the property items
    /// of the relationship-type sections.
    pub fn rows(&self) -> Vec<MetaRow> {
        let mut rows = Vec::new();
        for (key, section) in self.sections() {
            let other_labels = match key.kind {
                EntityKind::Node => self.co_labels(&key.name),
                EntityKind::Relationship => Vec::new(),
            };
            for item in section.values() {
                if key.kind == EntityKind::Relationship && item.is_relationship() {
                    continue;
                }
                rows.push(MetaRow::from_item(item, other_labels.clone()));
            }
        }
        rows
    }

    /// Nested schema document keyed by label and relationship type. A type
    /// named like a label is keyed `NAME (RELATIONSHIP)`.
    pub fn schema(&self, labels: &LabelStats, rel_types: &RelTypeStats) -> Json {
        let mut incoming: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        for (key, section) in self.sections() {
            if key.kind != EntityKind::Node {
                continue;
            }
            for item in section.values().filter(|i| i.is_relationship()) {
                for target in &item.other {
                    incoming
                        .entry(target.clone())
                        .or_default()
                        .entry(item.key.clone())
                        .or_default()
                        .push(key.name.clone());
                }
            }
        }

        let mut doc = Map::new();
        for (key, section) in self.sections() {
            match key.kind {
                EntityKind::Node => {
                    let mut relationships = Map::new();
                    for item in section.values().filter(|i| i.is_relationship()) {
                        relationships.insert(
                            item.key.clone(),
                            json!({
                                "direction": "out",
                                "count": rel_types.outgoing(&key.name, &item.key),
                                "labels": item.other.iter().collect::<Vec<_>>(),
                                "properties": self.rel_properties(&item.key),
                            }),
                        );
                    }
                    for (rel_type, sources) in incoming.get(&key.name).into_iter().flatten() {
                        if relationships.contains_key(rel_type) {
                            continue;
                        }
                        relationships.insert(
                            rel_type.clone(),
                            json!({
                                "direction": "in",
                                "count": rel_types.incoming(&key.name, rel_type),
                                "labels": sources,
                                "properties": self.rel_properties(rel_type),
                            }),
                        );
                    }
                    doc.insert(
                        key.name.clone(),
                        json!({
                            "type": "node",
                            "count": labels.get(&key.name).copied().unwrap_or(0),
                            "labels": self.co_labels(&key.name),
                            "properties": property_map(section.values()),
                            "relationships": relationships,
                        }),
                    );
                }
                EntityKind::Relationship => {
                    let name = if labels.contains_key(&key.name) {
                        format!("{} (RELATIONSHIP)", key.name)
                    } else {
                        key.name.clone()
                    };
                    doc.insert(
                        name,
                        json!({
                            "type": "relationship",
                            "count": rel_types.counts.get(&key.name).copied().unwrap_or(0),
                            "properties": property_map(section.values()),
                        }),
                    );
                }
            }
        }
        Json::Object(doc)
    }

    fn rel_properties(&self, rel_type: &str) -> Json {
        let key = crate::models::MetadataKey::relationship(rel_type);
        match self.section(&key) {
            Some(section) => property_map(section.values()),
            None => Json::Object(Map::new()),
        }
    }
}

fn property_map<'a>(items: impl Iterator<Item = &'a MetaItem>) -> Json {
    let mut properties = Map::new();
    for item in items.filter(|i| i.type_name != MetaType::Relationship) {
        let type_name = if item.array {
            format!("LIST OF {}", item.type_name.name())
        } else {
            item.type_name.name().to_string()
        };
        properties.insert(
            item.key.clone(),
            json!({
                "type": type_name,
                "array": item.array,
                "unique": item.unique,
                "indexed": item.index,
                "existence": item.existence,
            }),
        );
    }
    Json::Object(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures;
    use crate::meta::{MetaConfig, MetaItemCollector, SampleSelector, StatsAggregator};
    use crate::utils::CancellationToken;

    fn social_meta() -> (MetaData, crate::meta::GraphStats) {
        let graph = fixtures::social();
        let config = MetaConfig {
            sample: -1,
            ..MetaConfig::default()
        };
        let cancel = CancellationToken::new();
        let meta = MetaItemCollector::new(&graph, &config, &cancel)
            .collect(&mut SampleSelector::seeded(9))
            .unwrap();
        let stats = StatsAggregator::new(&graph, &cancel).aggregate(None, None).unwrap();
        (meta, stats)
    }

    #[test]
    fn test_rows_skip_degree_items_of_type_sections() {
        let (meta, _) = social_meta();
        let rows = meta.rows();
        assert!(rows.iter().any(|r| {
            r.label == "Person" && r.property == "KNOWS" && r.type_name == "RELATIONSHIP"
        }));
        assert!(rows.iter().any(|r| {
            r.label == "KNOWS"
                && r.property == "since"
                && r.element_type == EntityKind::Relationship
        }));
        assert!(!rows
            .iter()
            .any(|r| r.label == "KNOWS" && r.type_name == "RELATIONSHIP"));
        let carol_row = rows
            .iter()
            .find(|r| r.label == "Person" && r.property == "name")
            .unwrap();
        assert_eq!(carol_row.other_labels, vec!["Employee".to_string()]);
    }

    #[test]
    fn test_schema_lists_both_directions() {
        let (meta, stats) = social_meta();
        let schema = meta.schema(&stats.labels, &stats.rel_type_stats());

        let person = &schema["Person"];
        assert_eq!(person["type"], "node");
        assert_eq!(person["count"], 3);
        assert_eq!(person["properties"]["name"]["unique"], true);
        assert_eq!(person["properties"]["tags"]["type"], "LIST OF STRING");
        assert_eq!(person["relationships"]["OWNS"]["direction"], "out");
        assert_eq!(person["relationships"]["OWNS"]["count"], 2);

        let dog = &schema["Dog"];
        assert_eq!(dog["relationships"]["OWNS"]["direction"], "in");
        assert_eq!(dog["relationships"]["OWNS"]["count"], 2);

        let owns = &schema["OWNS"];
        assert_eq!(owns["type"], "relationship");
        assert_eq!(owns["count"], 2);
    }
}
