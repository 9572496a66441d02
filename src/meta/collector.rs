use std::collections::{BTreeMap, BTreeSet};

use super::sample::SampleSelector;
use super::{rel_cap, MetaConfig};
use crate::error::Result;
use crate::graph::GraphStore;
use crate::models::{Direction, EntityKind, MetaItem, MetadataKey, Node, Relationship};
use crate::utils::CancellationToken;

/// Items recorded under one label or relationship type, keyed by property
/// key or relationship type name.
pub type MetaSection = BTreeMap<String, MetaItem>;

/// Schema facts of one label or relationship type, read once per collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSchema {
    pub unique: BTreeSet<String>,
    pub indexed: BTreeSet<String>,
    pub existence: BTreeSet<String>,
}

impl LabelSchema {
    pub fn load<S: GraphStore + ?Sized>(store: &S, entity: EntityKind, name: &str) -> Result<Self> {
        let mut schema = LabelSchema::default();
        for constraint in store.constraints(entity, Some(name))? {
            if constraint.kind.implies_uniqueness() {
                // a composite key does not make its parts unique on their own
                if let [single] = constraint.properties.as_slice() {
                    schema.unique.insert(single.clone());
                }
                schema.indexed.extend(constraint.properties.iter().cloned());
            }
            if constraint.kind.implies_existence() {
                schema.existence.extend(constraint.properties.iter().cloned());
            }
        }
        for index in store.indexes(entity, Some(name))? {
            schema.indexed.extend(index.properties);
        }
        Ok(schema)
    }

    pub fn apply(&self, key: &str, item: MetaItem) -> MetaItem {
        item.with_schema(
            self.unique.contains(key),
            self.indexed.contains(key),
            self.existence.contains(key),
        )
    }
}

/// Result of one collection pass. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaData {
    sections: BTreeMap<MetadataKey, MetaSection>,
    co_labels: BTreeMap<String, BTreeSet<String>>,
}

impl MetaData {
    pub fn section(&self, key: &MetadataKey) -> Option<&MetaSection> {
        self.sections.get(key)
    }

    pub fn item(&self, key: &MetadataKey, name: &str) -> Option<&MetaItem> {
        self.sections.get(key).and_then(|s| s.get(name))
    }

    pub fn sections(&self) -> impl Iterator<Item = (&MetadataKey, &MetaSection)> {
        self.sections.iter()
    }

    /// Other labels carried by sampled nodes of `label`.
    pub fn co_labels(&self, label: &str) -> Vec<String> {
        self.co_labels
            .get(label)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Accumulates metadata items. Property shapes are first-writer-wins,
/// relationship degree items are merged through [`MetaItem::merge`].
#[derive(Debug, Default)]
pub struct MetaDataBuilder {
    sections: BTreeMap<MetadataKey, MetaSection>,
    co_labels: BTreeMap<String, BTreeSet<String>>,
}

impl MetaDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure a section exists even when nothing gets recorded in it.
    pub fn section(&mut self, key: MetadataKey) -> &mut MetaSection {
        self.sections.entry(key).or_default()
    }

    /// Records `item` unless the key already holds an observation.
    pub fn observe(&mut self, key: &MetadataKey, item: MetaItem) {
        self.section(key.clone())
            .entry(item.key.clone())
            .or_insert(item);
    }

    /// Folds `item` into the record under the same key. A record of a
    /// different type (a property named like a relationship type) is left
    /// alone.
    pub fn merge_item(&mut self, key: &MetadataKey, item: MetaItem) {
        let section = self.section(key.clone());
        match section.get_mut(&item.key) {
            Some(existing) if existing.type_name == item.type_name => existing.merge(&item),
            Some(existing) => {
                tracing::debug!(
                    section = %key,
                    key = %item.key,
                    kept = %existing.type_name,
                    "type clash, keeping first observation"
                );
            }
            None => {
                section.insert(item.key.clone(), item);
            }
        }
    }

    pub fn co_label(&mut self, label: &str, others: impl IntoIterator<Item = String>) {
        self.co_labels
            .entry(label.to_string())
            .or_default()
            .extend(others);
    }

    pub fn build(self) -> MetaData {
        MetaData {
            sections: self.sections,
            co_labels: self.co_labels,
        }
    }
}

/// Samples nodes of every allowed label and records property and
/// relationship metadata.
pub struct MetaItemCollector<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    config: &'a MetaConfig,
    cancel: &'a CancellationToken,
}

impl<'a, S: GraphStore + ?Sized> MetaItemCollector<'a, S> {
    pub fn new(store: &'a S, config: &'a MetaConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            store,
            config,
            cancel,
        }
    }

    pub fn collect(&self, selector: &mut SampleSelector) -> Result<MetaData> {
        self.config.validate()?;
        let mut builder = MetaDataBuilder::new();
        let mut rel_schemas: BTreeMap<String, LabelSchema> = BTreeMap::new();

        for label in self.store.labels_in_use()? {
            if !self.config.label_allowed(&label) {
                continue;
            }
            self.cancel.check()?;
            let population = self.store.count_nodes(Some(&label))?;
            let stride = selector.sample_stride(population, self.config.sample);
            tracing::debug!(%label, population, stride = stride.as_raw(), "sampling label");

            let schema = LabelSchema::load(self.store, EntityKind::Node, &label)?;
            let key = MetadataKey::node(&label);
            builder.section(key.clone());

            for (index, node) in self.store.nodes_by_label(&label)?.enumerate() {
                if !stride.selects(index as u64 + 1) {
                    continue;
                }
                self.cancel.check()?;
                builder.co_label(
                    &label,
                    node.labels.iter().filter(|l| **l != label).cloned(),
                );
                self.collect_relationships(&mut builder, &mut rel_schemas, &label, node)?;
                for (name, value) in &node.properties {
                    if value.is_null() {
                        continue;
                    }
                    let item = MetaItem::property(&label, name, EntityKind::Node, value);
                    builder.observe(&key, schema.apply(name, item));
                }
            }
        }

        Ok(builder.build())
    }

    fn collect_relationships(
        &self,
        builder: &mut MetaDataBuilder,
        rel_schemas: &mut BTreeMap<String, LabelSchema>,
        label: &str,
        node: &Node,
    ) -> Result<()> {
        let cap = rel_cap(self.config.max_rels);
        for rel_type in self.store.relationship_types_of(node.id)? {
            if !self.config.rel_allowed(&rel_type) {
                continue;
            }
            let out = self.store.degree(node.id, Direction::Outgoing, Some(&rel_type))?;
            if out == 0 {
                continue;
            }
            let incoming = self.store.degree(node.id, Direction::Incoming, Some(&rel_type))?;

            let mut others = BTreeSet::new();
            let mut representative: Option<&Relationship> = None;
            let traversed = self
                .store
                .relationships(node.id, Direction::Outgoing, Some(&rel_type))?;
            for rel in traversed.take(cap.unwrap_or(usize::MAX)) {
                representative.get_or_insert(rel);
                if let Some(other) = self.store.node(rel.end)? {
                    others.extend(other.labels.iter().cloned());
                }
            }

            let mut by_label = MetaItem::relationship(label, &rel_type, EntityKind::Node);
            by_label.rel(out, incoming);
            by_label.add_other(&others);
            builder.merge_item(&MetadataKey::node(label), by_label);

            let type_key = MetadataKey::relationship(&rel_type);
            let mut by_type = MetaItem::relationship(&rel_type, label, EntityKind::Relationship);
            by_type.rel(out, incoming);
            by_type.add_other(&others);
            builder.merge_item(&type_key, by_type);

            if let Some(rel) = representative {
                if !rel_schemas.contains_key(&rel_type) {
                    let schema =
                        LabelSchema::load(self.store, EntityKind::Relationship, &rel_type)?;
                    rel_schemas.insert(rel_type.clone(), schema);
                }
                let schema = &rel_schemas[&rel_type];
                for (name, value) in &rel.properties {
                    if value.is_null() {
                        continue;
                    }
                    let item = MetaItem::property(&rel_type, name, EntityKind::Relationship, value);
                    builder.observe(&type_key, schema.apply(name, item));
                }
            }
        }
        Ok(())
    }
}
