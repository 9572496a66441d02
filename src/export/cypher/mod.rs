//! Cypher script export: schema, nodes, relationships, then removal of the
//! synthetic identity markers.

pub mod format;
pub mod uniqueness;
pub mod unwind;

use serde::Serialize;
use std::io::Write;

use self::format::{
    constraint_statement, drop_unique_id_constraint, index_statement, node_cleanup, node_lookup,
    node_statement, relationship_cleanup, relationship_statement, unique_id_constraint,
};
use self::uniqueness::{
    UniqueConstraintIndex, UniquenessTracker, UNIQUE_ID_LABEL, UNIQUE_ID_PROP, UNIQUE_ID_REL,
};
use self::unwind::{endpoint, UnwindPlanner, UnwindStatement};
use super::batch::BatchState;
use super::progress::ProgressReporter;
use super::sink::ExportSink;
use super::subgraph::SubGraph;
use super::ExportConfig;
use crate::error::{Error, Result};
use crate::graph::GraphStore;
use crate::utils::CancellationToken;

/// Synthetic ids handed out during one export. Cleanup drains both to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCounters {
    pub artificial_unique_nodes: u64,
    pub artificial_unique_rels: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExportPhase {
    Init,
    SchemaEmitted,
    NodesEmitted,
    RelationshipsEmitted,
    CleanupEmitted,
    Done,
}

impl ExportPhase {
    pub fn next(self) -> Option<ExportPhase> {
        match self {
            ExportPhase::Init => Some(ExportPhase::SchemaEmitted),
            ExportPhase::SchemaEmitted => Some(ExportPhase::NodesEmitted),
            ExportPhase::NodesEmitted => Some(ExportPhase::RelationshipsEmitted),
            ExportPhase::RelationshipsEmitted => Some(ExportPhase::CleanupEmitted),
            ExportPhase::CleanupEmitted => Some(ExportPhase::Done),
            ExportPhase::Done => None,
        }
    }

    /// Moves to `to`, which has to be the immediate successor.
    pub fn advance(&mut self, to: ExportPhase) -> Result<()> {
        if self.next() != Some(to) {
            return Err(Error::malformed(format!(
                "export phase {self:?} cannot move to {to:?}"
            )));
        }
        tracing::debug!(from = ?self, to = ?to, "export phase");
        *self = to;
        Ok(())
    }
}

/// What a finished Cypher export did.
#[derive(Debug, Clone, PartialEq)]
pub struct CypherOutcome {
    pub phase: ExportPhase,
    /// Synthetic ids assigned during INIT
    pub artificial: ExportCounters,
    /// Counters after cleanup
    pub remaining: ExportCounters,
    pub node_blocks: Vec<usize>,
    pub relationship_blocks: Vec<usize>,
    /// Entities covered by each node cleanup step
    pub node_cleanup_steps: Vec<u64>,
    pub relationship_cleanup_steps: Vec<u64>,
}

pub struct CypherExporter<'a, S: GraphStore + ?Sized> {
    subgraph: &'a SubGraph<'a, S>,
    config: &'a ExportConfig,
    cancel: &'a CancellationToken,
}

fn line(sink: &mut dyn ExportSink, name: &str, text: &str) -> Result<()> {
    writeln!(sink.writer(name)?, "{text}")?;
    Ok(())
}

impl<'a, S: GraphStore + ?Sized> CypherExporter<'a, S> {
    pub fn new(
        subgraph: &'a SubGraph<'a, S>,
        config: &'a ExportConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            subgraph,
            config,
            cancel,
        }
    }

    pub fn export(
        &self,
        sink: &mut dyn ExportSink,
        reporter: &mut ProgressReporter,
    ) -> Result<CypherOutcome> {
        let mut phase = ExportPhase::Init;
        self.check_reserved_names()?;
        let tracker = self.prepare()?;
        let artificial = tracker.counters();
        tracing::info!(
            artificial_nodes = artificial.artificial_unique_nodes,
            artificial_rels = artificial.artificial_unique_rels,
            "synthetic identities assigned"
        );

        self.write_schema(sink, artificial)?;
        self.end_phase(sink, reporter, &mut phase, ExportPhase::SchemaEmitted)?;

        let node_blocks = if self.config.optimized() {
            let planner = self.planner(&tracker);
            self.write_unwind(
                sink,
                reporter,
                "nodes",
                planner.node_statements(self.subgraph),
                true,
            )?
        } else {
            self.write_nodes(sink, reporter, &tracker)?
        };
        self.end_phase(sink, reporter, &mut phase, ExportPhase::NodesEmitted)?;

        let relationship_blocks = if self.config.optimized() {
            let planner = self.planner(&tracker);
            let statements = planner.relationship_statements(self.subgraph)?;
            self.write_unwind(sink, reporter, "relationships", statements, false)?
        } else {
            self.write_relationships(sink, reporter, &tracker)?
        };
        self.end_phase(sink, reporter, &mut phase, ExportPhase::RelationshipsEmitted)?;

        let mut remaining = artificial;
        let node_cleanup_steps = self.drain(
            sink,
            &mut remaining.artificial_unique_nodes,
            node_cleanup,
        )?;
        if artificial.artificial_unique_nodes > 0 {
            self.block(sink, "cleanup", &[drop_unique_id_constraint()])?;
        }
        let relationship_cleanup_steps = self.drain(
            sink,
            &mut remaining.artificial_unique_rels,
            relationship_cleanup,
        )?;
        self.end_phase(sink, reporter, &mut phase, ExportPhase::CleanupEmitted)?;

        phase.advance(ExportPhase::Done)?;
        Ok(CypherOutcome {
            phase,
            artificial,
            remaining,
            node_blocks,
            relationship_blocks,
            node_cleanup_steps,
            relationship_cleanup_steps,
        })
    }

    fn planner<'t>(&self, tracker: &'t UniquenessTracker) -> UnwindPlanner<'t> {
        UnwindPlanner {
            format: self.config.cypher_format,
            mode: self.config.use_optimizations.kind,
            rows_per_statement: self.config.use_optimizations.unwind_batch_size,
            tracker,
        }
    }

    /// Store properties named like the synthetic markers would be clobbered
    /// by the export.
    fn check_reserved_names(&self) -> Result<()> {
        for node in self.subgraph.nodes() {
            if node.properties.contains_key(UNIQUE_ID_PROP) || node.has_label(UNIQUE_ID_LABEL) {
                return Err(Error::malformed(format!(
                    "node {} uses the reserved name '{UNIQUE_ID_PROP}'",
                    node.id
                )));
            }
        }
        for rel in self.subgraph.relationships() {
            if rel.properties.contains_key(UNIQUE_ID_REL) {
                return Err(Error::malformed(format!(
                    "relationship {} uses the reserved property '{UNIQUE_ID_REL}'",
                    rel.id
                )));
            }
        }
        Ok(())
    }

    /// INIT: builds the constraint index and counts every synthetic id up
    /// front, so the schema phase knows whether the temporary constraint is
    /// needed.
    fn prepare(&self) -> Result<UniquenessTracker> {
        let constraints = self.subgraph.constraints()?;
        let mut tracker = UniquenessTracker::new(UniqueConstraintIndex::build(&constraints));
        for node in self.subgraph.nodes() {
            if !tracker.is_naturally_unique(node) {
                tracker.assign_synthetic_id(node);
            }
        }
        if self.config.cypher_format.merges_relationships() {
            tracker.scan_relationships(self.subgraph.relationships().iter().copied());
            for rel in self.subgraph.relationships() {
                if !tracker.is_rel_naturally_unique(rel) {
                    tracker.assign_synthetic_rel_id(rel);
                }
            }
        }
        Ok(tracker)
    }

    fn begin(&self, sink: &mut dyn ExportSink, name: &str) -> Result<()> {
        match self.config.format.begin() {
            Some(marker) => line(sink, name, marker),
            None => Ok(()),
        }
    }

    fn commit(&self, sink: &mut dyn ExportSink, name: &str) -> Result<()> {
        match self.config.format.commit() {
            Some(marker) => line(sink, name, marker),
            None => Ok(()),
        }
    }

    fn block(&self, sink: &mut dyn ExportSink, name: &str, statements: &[String]) -> Result<()> {
        self.begin(sink, name)?;
        for statement in statements {
            line(sink, name, statement)?;
        }
        self.commit(sink, name)
    }

    fn write_schema(&self, sink: &mut dyn ExportSink, artificial: ExportCounters) -> Result<()> {
        let if_not_exists = self.config.if_not_exists;
        let mut statements: Vec<String> = self
            .subgraph
            .constraints()?
            .iter()
            .map(|c| constraint_statement(c, if_not_exists))
            .collect();
        statements.extend(
            self.subgraph
                .indexes()?
                .iter()
                .map(|i| index_statement(i, if_not_exists)),
        );
        if artificial.artificial_unique_nodes > 0 {
            statements.push(unique_id_constraint(if_not_exists));
        }
        if statements.is_empty() {
            return Ok(());
        }
        self.block(sink, "schema", &statements)?;
        line(
            sink,
            "schema",
            &self.config.format.schema_await(self.config.await_for_indexes),
        )
    }

    fn write_nodes(
        &self,
        sink: &mut dyn ExportSink,
        reporter: &mut ProgressReporter,
        tracker: &UniquenessTracker,
    ) -> Result<Vec<usize>> {
        let mut batch = BatchState::new(self.config.batch_size);
        let (mut nodes, mut props) = (0u64, 0u64);
        for node in self.subgraph.nodes() {
            self.cancel.check()?;
            if batch.count() == 0 {
                self.begin(sink, "nodes")?;
            }
            if batch.advance() {
                self.close_block(sink, reporter, "nodes", (nodes, 0, props))?;
                (nodes, props) = (0, 0);
                self.begin(sink, "nodes")?;
            }
            let statement = node_statement(self.config.cypher_format, tracker.key_for(node), node);
            line(sink, "nodes", &statement)?;
            nodes += 1;
            props += node.properties.values().filter(|v| !v.is_null()).count() as u64;
        }
        if batch.finish() {
            self.close_block(sink, reporter, "nodes", (nodes, 0, props))?;
        }
        Ok(batch.closed_blocks().to_vec())
    }

    fn write_relationships(
        &self,
        sink: &mut dyn ExportSink,
        reporter: &mut ProgressReporter,
        tracker: &UniquenessTracker,
    ) -> Result<Vec<usize>> {
        let mut batch = BatchState::new(self.config.batch_size);
        let (mut rels, mut props) = (0u64, 0u64);
        for rel in self.subgraph.relationships() {
            self.cancel.check()?;
            if batch.count() == 0 {
                self.begin(sink, "relationships")?;
            }
            if batch.advance() {
                self.close_block(sink, reporter, "relationships", (0, rels, props))?;
                (rels, props) = (0, 0);
                self.begin(sink, "relationships")?;
            }
            let start = endpoint(self.subgraph, rel, rel.start)?;
            let end = endpoint(self.subgraph, rel, rel.end)?;
            let statement = relationship_statement(
                self.config.cypher_format,
                node_lookup(tracker.key_for(start), start),
                node_lookup(tracker.key_for(end), end),
                rel,
                tracker.has_synthetic_rel_id(rel),
            );
            line(sink, "relationships", &statement)?;
            rels += 1;
            props += rel.properties.values().filter(|v| !v.is_null()).count() as u64;
        }
        if batch.finish() {
            self.close_block(sink, reporter, "relationships", (0, rels, props))?;
        }
        Ok(batch.closed_blocks().to_vec())
    }

    /// Optimized path: UNWIND statements are grouped into transaction blocks
    /// of `batch_size` rows. A statement is never split across two blocks, so
    /// a block closes once it holds at least `batch_size` rows.
    fn write_unwind(
        &self,
        sink: &mut dyn ExportSink,
        reporter: &mut ProgressReporter,
        name: &str,
        statements: Vec<UnwindStatement>,
        nodes: bool,
    ) -> Result<Vec<usize>> {
        let counts = |rows: usize, props: u64| {
            if nodes {
                (rows as u64, 0, props)
            } else {
                (0, rows as u64, props)
            }
        };
        let mut blocks = Vec::new();
        let (mut rows, mut props) = (0usize, 0u64);
        for statement in statements {
            self.cancel.check()?;
            if rows == 0 {
                self.begin(sink, name)?;
            }
            if let Some(param) = &statement.param {
                line(sink, name, param)?;
            }
            line(sink, name, &statement.statement)?;
            rows += statement.rows;
            props += statement.properties;
            if rows >= self.config.batch_size {
                self.close_block(sink, reporter, name, counts(rows, props))?;
                blocks.push(rows);
                (rows, props) = (0, 0);
            }
        }
        if rows > 0 {
            self.close_block(sink, reporter, name, counts(rows, props))?;
            blocks.push(rows);
        }
        Ok(blocks)
    }

    fn close_block(
        &self,
        sink: &mut dyn ExportSink,
        reporter: &mut ProgressReporter,
        name: &str,
        (nodes, rels, props): (u64, u64, u64),
    ) -> Result<()> {
        self.commit(sink, name)?;
        reporter.next_batch();
        self.progress(sink, reporter, nodes, rels, props)
    }

    fn progress(
        &self,
        sink: &mut dyn ExportSink,
        reporter: &mut ProgressReporter,
        nodes: u64,
        rels: u64,
        props: u64,
    ) -> Result<()> {
        if let Some(data) = sink.take_streamed() {
            reporter.attach(data);
        }
        reporter.update(nodes, rels, props)
    }

    /// Emits one cleanup statement per batch-sized step until `counter` is
    /// zero. Steps are sequential transactions.
    fn drain(
        &self,
        sink: &mut dyn ExportSink,
        counter: &mut u64,
        statement: fn(u64) -> String,
    ) -> Result<Vec<u64>> {
        let step = self.config.batch_size as u64;
        let mut steps = Vec::new();
        while *counter > 0 {
            self.cancel.check()?;
            let covered = (*counter).min(step);
            self.block(sink, "cleanup", &[statement(step)])?;
            *counter -= covered;
            steps.push(covered);
        }
        Ok(steps)
    }

    fn end_phase(
        &self,
        sink: &mut dyn ExportSink,
        reporter: &mut ProgressReporter,
        phase: &mut ExportPhase,
        to: ExportPhase,
    ) -> Result<()> {
        sink.flush()?;
        phase.advance(to)?;
        if reporter.is_streaming() {
            self.progress(sink, reporter, 0, 0, 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::sink::MemorySink;
    use crate::export::{CypherFormat, ExportFormat, OptimizationType, Optimizations, TxFormat};
    use crate::graph::{fixtures, MemoryGraph};
    use crate::models::{props, Properties};

    fn run(graph: &MemoryGraph, config: &ExportConfig) -> (CypherOutcome, MemorySink) {
        let sub = SubGraph::database(graph).unwrap();
        let cancel = CancellationToken::new();
        let mut sink = MemorySink::new();
        let mut reporter = ProgressReporter::new(None, ExportFormat::Cypher, config.batch_size);
        let outcome = CypherExporter::new(&sub, config, &cancel)
            .export(&mut sink, &mut reporter)
            .unwrap();
        (outcome, sink)
    }

    #[test]
    fn test_phase_order_is_enforced() {
        let mut phase = ExportPhase::Init;
        assert!(phase.advance(ExportPhase::NodesEmitted).is_err());
        phase.advance(ExportPhase::SchemaEmitted).unwrap();
        assert_eq!(phase, ExportPhase::SchemaEmitted);
        let mut done = ExportPhase::Done;
        assert!(done.advance(ExportPhase::Init).is_err());
    }

    #[test]
    fn test_social_export_script() {
        let graph = fixtures::social();
        let (outcome, sink) = run(&graph, &ExportConfig::default());
        assert_eq!(outcome.phase, ExportPhase::Done);
        // Rex, Fido and Paris lack a natural key
        assert_eq!(outcome.artificial.artificial_unique_nodes, 3);
        assert_eq!(outcome.artificial.artificial_unique_rels, 0);
        assert_eq!(outcome.remaining, ExportCounters::default());

        let schema = sink.contents("schema").unwrap();
        assert!(schema.starts_with("BEGIN\n"));
        assert!(
            schema.contains("CREATE CONSTRAINT FOR (node:Person) REQUIRE (node.name) IS UNIQUE;")
        );
        assert!(schema.contains("CREATE CONSTRAINT UNIQUE_IMPORT_NAME"));
        assert!(schema.ends_with("COMMIT\nSCHEMA AWAIT\n"));

        let nodes = sink.contents("nodes").unwrap();
        assert!(nodes.contains("CREATE (:Person {age:34, name:\"Alice\"});"));
        assert!(nodes.contains(
            "CREATE (:Dog:`UNIQUE IMPORT LABEL` {`UNIQUE IMPORT ID`:3, name:\"Rex\"});"
        ));

        let rels = sink.contents("relationships").unwrap();
        assert!(rels.contains(
            "MATCH (n1:Person{name:\"Alice\"}), (n2:`UNIQUE IMPORT LABEL`{`UNIQUE IMPORT ID`:3}) CREATE (n1)-[r:OWNS]->(n2);"
        ));

        let cleanup = sink.contents("cleanup").unwrap();
        assert_eq!(
            cleanup,
            "BEGIN\nMATCH (n:`UNIQUE IMPORT LABEL`) WITH n LIMIT 20000 REMOVE n:`UNIQUE IMPORT LABEL`, n.`UNIQUE IMPORT ID`;\nCOMMIT\nBEGIN\nDROP CONSTRAINT UNIQUE_IMPORT_NAME;\nCOMMIT\n"
        );
    }

    #[test]
    fn test_batch_boundaries_of_twenty_five_nodes() {
        let graph = fixtures::chain(25);
        let config = ExportConfig {
            batch_size: 10,
            ..ExportConfig::default()
        };
        let (outcome, sink) = run(&graph, &config);
        assert_eq!(outcome.node_blocks, vec![10, 10, 5]);
        let nodes = sink.contents("nodes").unwrap();
        assert_eq!(nodes.matches("BEGIN\n").count(), 3);
        assert_eq!(nodes.matches("COMMIT\n").count(), 3);
        assert_eq!(outcome.relationship_blocks, vec![10, 10, 4]);
    }

    #[test]
    fn test_cleanup_drains_in_batch_sized_steps() {
        let graph = fixtures::chain(25);
        let config = ExportConfig {
            batch_size: 10,
            format: TxFormat::CypherShell,
            ..ExportConfig::default()
        };
        let (outcome, sink) = run(&graph, &config);
        assert_eq!(outcome.node_cleanup_steps, vec![10, 10, 5]);
        assert_eq!(
            outcome.node_cleanup_steps.iter().sum::<u64>(),
            outcome.artificial.artificial_unique_nodes
        );
        assert_eq!(outcome.remaining.artificial_unique_nodes, 0);
        let cleanup = sink.contents("cleanup").unwrap();
        assert_eq!(cleanup.matches("LIMIT 10 REMOVE").count(), 3);
        assert_eq!(cleanup.matches(":begin\n").count(), 4);
        assert!(sink.contents("schema").unwrap().ends_with("CALL db.awaitIndexes(300);\n"));
    }

    #[test]
    fn test_update_format_tags_parallel_relationships() {
        let graph = fixtures::social();
        let config = ExportConfig {
            cypher_format: CypherFormat::UpdateAll,
            ..ExportConfig::default()
        };
        let (outcome, sink) = run(&graph, &config);
        assert_eq!(outcome.artificial.artificial_unique_rels, 2);
        assert_eq!(outcome.relationship_cleanup_steps, vec![2]);
        assert_eq!(outcome.remaining, ExportCounters::default());
        let rels = sink.contents("relationships").unwrap();
        assert_eq!(rels.matches("`UNIQUE IMPORT ID REL`").count(), 2);
        assert!(sink
            .contents("cleanup")
            .unwrap()
            .contains("WHERE r.`UNIQUE IMPORT ID REL` IS NOT NULL WITH r LIMIT 20000"));
    }

    #[test]
    fn test_no_synthetic_ids_means_no_cleanup() {
        let mut graph = MemoryGraph::new();
        graph.add_constraint(crate::models::ConstraintDef::unique("User", &["id"]));
        let a = graph.create_node(&["User"], props([("id", 1i64)]));
        let b = graph.create_node(&["User"], props([("id", 2i64)]));
        graph.create_relationship(a, b, "FOLLOWS", Properties::new()).unwrap();
        let config = ExportConfig {
            format: TxFormat::Plain,
            ..ExportConfig::default()
        };
        let (outcome, sink) = run(&graph, &config);
        assert_eq!(outcome.artificial, ExportCounters::default());
        assert!(sink.contents("cleanup").is_none());
        let schema = sink.contents("schema").unwrap();
        assert!(!schema.contains("UNIQUE_IMPORT_NAME"));
        assert!(!schema.contains("BEGIN"));
    }

    #[test]
    fn test_reserved_property_is_rejected() {
        let mut graph = MemoryGraph::new();
        graph.create_node(&["Thing"], props([(UNIQUE_ID_PROP, 1i64)]));
        let sub = SubGraph::database(&graph).unwrap();
        let cancel = CancellationToken::new();
        let mut sink = MemorySink::new();
        let mut reporter = ProgressReporter::new(None, ExportFormat::Cypher, 10);
        let err = CypherExporter::new(&sub, &ExportConfig::default(), &cancel)
            .export(&mut sink, &mut reporter)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
        assert!(sink.names().is_empty());
    }

    #[test]
    fn test_cancellation_stops_the_export() {
        let graph = fixtures::chain(5);
        let sub = SubGraph::database(&graph).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sink = MemorySink::new();
        let mut reporter = ProgressReporter::new(None, ExportFormat::Cypher, 10);
        let err = CypherExporter::new(&sub, &ExportConfig::default(), &cancel)
            .export(&mut sink, &mut reporter)
            .unwrap_err();
        assert!(err.is_terminated());
    }

    #[test]
    fn test_optimized_export_uses_unwind_blocks() {
        let graph = fixtures::chain(45);
        let config = ExportConfig {
            use_optimizations: Optimizations {
                kind: OptimizationType::UnwindBatch,
                unwind_batch_size: 20,
            },
            ..ExportConfig::default()
        };
        let (outcome, sink) = run(&graph, &config);
        // all rows fit into one transaction of the default batch size
        assert_eq!(outcome.node_blocks, vec![45]);
        assert_eq!(outcome.relationship_blocks, vec![44]);
        assert_eq!(outcome.artificial.artificial_unique_nodes, 45);
        let nodes = sink.contents("nodes").unwrap();
        assert_eq!(nodes.matches("UNWIND [").count(), 3);
        assert_eq!(nodes.matches("BEGIN\n").count(), 1);
        assert_eq!(outcome.remaining, ExportCounters::default());
    }

    #[test]
    fn test_unwind_transactions_follow_batch_size() {
        let graph = fixtures::chain(45);
        let config = ExportConfig {
            batch_size: 40,
            format: TxFormat::CypherShell,
            use_optimizations: Optimizations {
                kind: OptimizationType::UnwindBatch,
                unwind_batch_size: 20,
            },
            ..ExportConfig::default()
        };
        let (outcome, sink) = run(&graph, &config);
        assert_eq!(outcome.node_blocks, vec![40, 5]);
        assert_eq!(outcome.relationship_blocks, vec![40, 4]);
        let nodes = sink.contents("nodes").unwrap();
        assert_eq!(nodes.matches("UNWIND [").count(), 3);
        assert_eq!(nodes.matches(":begin\n").count(), 2);
        assert_eq!(nodes.matches(":commit\n").count(), 2);
        let rels = sink.contents("relationships").unwrap();
        assert_eq!(rels.matches(":begin\n").count(), 2);
    }

    #[test]
    fn test_param_lines_precede_their_statement() {
        let graph = fixtures::chain(5);
        let config = ExportConfig {
            format: TxFormat::CypherShell,
            use_optimizations: Optimizations {
                kind: OptimizationType::UnwindBatchParams,
                unwind_batch_size: 2,
            },
            ..ExportConfig::default()
        };
        let (outcome, sink) = run(&graph, &config);
        assert_eq!(outcome.node_blocks, vec![5]);
        let nodes = sink.contents("nodes").unwrap();
        let lines: Vec<&str> = nodes.lines().collect();
        assert_eq!(lines.first(), Some(&":begin"));
        assert_eq!(lines.last(), Some(&":commit"));
        assert_eq!(nodes.matches(":param batch => ").count(), 3);
        for (i, line) in lines.iter().enumerate() {
            if line.starts_with(":param") {
                assert!(lines[i + 1].starts_with("UNWIND $batch AS row"));
            }
        }
    }
}
