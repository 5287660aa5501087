//! Pipeline coordinator
//!
//! Sequences the stages for one analysis task: validate the graph, build the
//! description, run the layout engine, normalize coordinates, render the
//! TOSCA documents, then commit them. Each task owns its graph, config, and
//! coordinate map exclusively; nothing is shared across tasks.
//!
//! Documents are rendered in memory before any of them is written, so an
//! emission failure leaves zero output documents behind.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::LayoutConfig;
use crate::dot::build_dot;
use crate::error::TopolayResult;
use crate::fs::{atomic_write, TaskPaths};
use crate::layout::{compute_layout, LayoutEngine};
use crate::model::DeploymentGraph;
use crate::tosca::emit_documents;

/// Result summary for one completed task
#[derive(Debug, Clone, Serialize)]
pub struct LayoutOutcome {
    pub process_id: Uuid,
    pub nodes: usize,
    pub files: Vec<PathBuf>,
}

/// One-task pipeline over an injected layout engine
pub struct Pipeline<'a> {
    engine: &'a dyn LayoutEngine,
}

impl<'a> Pipeline<'a> {
    pub fn new(engine: &'a dyn LayoutEngine) -> Self {
        Self { engine }
    }

    /// Run the whole pipeline for one task, writing all artifacts under
    /// `out_root`. Any stage failure aborts the task as a whole.
    pub fn run(
        &self,
        graph: &DeploymentGraph,
        config: &LayoutConfig,
        out_root: &Path,
    ) -> TopolayResult<LayoutOutcome> {
        config.validate()?;
        graph.validate()?;
        info!(
            process_id = %graph.process_id,
            components = graph.components.len(),
            relations = graph.relations.len(),
            "starting layout task"
        );

        let paths = TaskPaths::new(out_root, graph.process_id);
        let description = build_dot(graph, config);
        let dot_file = paths.dot_file();
        atomic_write(&dot_file, &description)?;
        debug!(path = %dot_file.display(), "graph description written");

        let layout = compute_layout(self.engine, &dot_file, graph, config)?;
        let outputs = emit_documents(graph, &layout)?;

        // Commit only after every document rendered cleanly.
        let mut files = Vec::with_capacity(outputs.len());
        for output in &outputs {
            let path = paths.resolve(output.path());
            atomic_write(&path, output.content())?;
            files.push(path);
        }
        info!(files = files.len(), "layout task finished");

        Ok(LayoutOutcome {
            process_id: graph.process_id,
            nodes: graph.components.len(),
            files,
        })
    }
}
