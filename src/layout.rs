//! Layout engine adapter
//!
//! Obtains 2-D placement for every node by delegating to an external,
//! deterministic layout computation. The computation sits behind the
//! `LayoutEngine` trait so the pipeline is testable without a Graphviz
//! install; `GraphvizEngine` is the default implementation and spawns
//! `dot -Tplain` with a bounded wait.
//!
//! Engine failures are never retried: the tool is deterministic, so a retry
//! with the same input would reproduce the same failure.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::LayoutConfig;
use crate::error::{TopolayError, TopolayResult};
use crate::model::DeploymentGraph;

/// Fixed top margin in pixels, reserved for title/metadata in the rendered
/// document. Part of the normalization contract.
pub const MARGIN_OFFSET_PX: i64 = 100;

/// Normalized node position in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// External layout computation behind a seam
pub trait LayoutEngine {
    /// Run the layout for the description at `dot_file` and return the
    /// engine's line-oriented plain-text coordinate dump.
    fn render(&self, dot_file: &Path) -> TopolayResult<String>;
}

/// Default engine: spawns the Graphviz `dot` binary
#[derive(Debug, Clone)]
pub struct GraphvizEngine {
    timeout: Duration,
}

impl GraphvizEngine {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for GraphvizEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine for GraphvizEngine {
    fn render(&self, dot_file: &Path) -> TopolayResult<String> {
        let mut child = Command::new("dot")
            .arg("-Tplain")
            .arg(dot_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TopolayError::LayoutEngine(format!("failed to start 'dot': {e}")))?;

        // Drain both pipes on background threads so a chatty process cannot
        // block on a full pipe while we poll for exit.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_handle = std::thread::spawn(move || read_pipe(stdout_pipe));
        let stderr_handle = std::thread::spawn(move || read_pipe(stderr_pipe));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(TopolayError::LayoutEngine(format!(
                            "'dot' did not finish within {:?}",
                            self.timeout
                        )));
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(e) => {
                    return Err(TopolayError::LayoutEngine(format!(
                        "failed waiting for 'dot': {e}"
                    )));
                }
            }
        };

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();

        if !status.success() {
            return Err(TopolayError::LayoutEngine(format!(
                "'dot' exited with {status}: {}",
                stderr.trim()
            )));
        }
        Ok(stdout)
    }
}

fn read_pipe(pipe: Option<impl Read>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

/// Parse the `-Tplain` coordinate dump.
///
/// Relevant lines have the shape `node <id> <x> <y> ...` with x/y in inches;
/// all other lines (graph, edge, stop) are ignored. A `node` line that does
/// not carry parseable coordinates is a layout-engine failure.
pub fn parse_plain(output: &str) -> TopolayResult<HashMap<String, (f64, f64)>> {
    let mut nodes = HashMap::new();
    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() != Some(&"node") {
            continue;
        }
        if fields.len() < 4 {
            return Err(TopolayError::LayoutEngine(format!(
                "unparseable node line in engine output: '{line}'"
            )));
        }
        let id = fields[1].trim_matches('"').to_string();
        let x = parse_coord(fields[2], line)?;
        let y = parse_coord(fields[3], line)?;
        nodes.insert(id, (x, y));
    }
    Ok(nodes)
}

fn parse_coord(field: &str, line: &str) -> TopolayResult<f64> {
    field.parse::<f64>().map_err(|_| {
        TopolayError::LayoutEngine(format!(
            "unparseable coordinate '{field}' in engine output line '{line}'"
        ))
    })
}

/// Convert engine-native inch coordinates into pixel space.
///
/// The formulas are a preserved contract:
/// `x_px = round(x * dpi)` and `y_px = round(|y - maxY| * dpi) + 100`,
/// flipping the y axis so the topmost node lands just below the margin.
pub fn normalize(raw: &HashMap<String, (f64, f64)>, dpi: f64) -> HashMap<String, Point> {
    let max_y = raw.values().fold(0.0_f64, |acc, &(_, y)| acc.max(y));
    raw.iter()
        .map(|(name, &(x, y))| {
            let point = Point {
                x: (x * dpi).round() as i64,
                y: ((y - max_y).abs() * dpi).round() as i64 + MARGIN_OFFSET_PX,
            };
            (name.clone(), point)
        })
        .collect()
}

/// Run the engine and return normalized coordinates for every component.
///
/// Postcondition: the map contains an entry for every component in `graph`.
/// A missing node means the engine output is unusable as a whole, not a
/// partially-usable result.
pub fn compute_layout(
    engine: &dyn LayoutEngine,
    dot_file: &Path,
    graph: &DeploymentGraph,
    config: &LayoutConfig,
) -> TopolayResult<HashMap<String, Point>> {
    let output = engine.render(dot_file)?;
    let raw = parse_plain(&output)?;
    let layout = normalize(&raw, config.dpi);
    for component in &graph.components {
        if !layout.contains_key(&component.name) {
            return Err(TopolayError::LayoutEngine(format!(
                "engine output is missing coordinates for component '{}'",
                component.name
            )));
        }
    }
    debug!(nodes = layout.len(), "layout computed");
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Component;
    use uuid::Uuid;

    const PLAIN_OUTPUT: &str = "\
graph 1 2.5 3.2
node web 1.0 2.0 3.125 0.833 web solid polygon black lightgrey
node db 1.0 0.5 3.125 0.833 db solid polygon black lightgrey
edge web db 4 1.0 1.9 1.0 1.4 1.0 1.0 1.0 0.6 solid black
stop
";

    struct FakeEngine(&'static str);

    impl LayoutEngine for FakeEngine {
        fn render(&self, _dot_file: &Path) -> TopolayResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_parse_plain_extracts_node_lines() {
        let raw = parse_plain(PLAIN_OUTPUT).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw["web"], (1.0, 2.0));
        assert_eq!(raw["db"], (1.0, 0.5));
    }

    #[test]
    fn test_parse_plain_strips_quotes_from_ids() {
        let raw = parse_plain("node \"my-app\" 0.5 0.25 1 1\n").unwrap();
        assert_eq!(raw["my-app"], (0.5, 0.25));
    }

    #[test]
    fn test_parse_plain_rejects_bad_coordinates() {
        let err = parse_plain("node web abc 2.0\n").unwrap_err();
        assert_eq!(err.kind(), "layout-engine");
    }

    #[test]
    fn test_parse_plain_rejects_truncated_node_line() {
        assert!(parse_plain("node web\n").is_err());
    }

    #[test]
    fn test_parse_plain_ignores_unrelated_lines() {
        let raw = parse_plain("graph 1 1 1\nedge a b\nstop\n").unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn test_normalize_formulas() {
        let raw = parse_plain(PLAIN_OUTPUT).unwrap();
        let layout = normalize(&raw, 72.0);
        // maxY = 2.0; web sits at the top, db below it
        assert_eq!(layout["web"], Point { x: 72, y: 100 });
        assert_eq!(layout["db"], Point { x: 72, y: 108 + 100 });
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = parse_plain(PLAIN_OUTPUT).unwrap();
        assert_eq!(normalize(&raw, 96.0), normalize(&raw, 96.0));
    }

    #[test]
    fn test_normalize_rounds_to_nearest_pixel() {
        let mut raw = HashMap::new();
        raw.insert("a".to_string(), (1.007, 0.0));
        let layout = normalize(&raw, 100.0);
        assert_eq!(layout["a"].x, 101);
        assert_eq!(layout["a"].y, MARGIN_OFFSET_PX);
    }

    #[test]
    fn test_compute_layout_covers_every_component() {
        let mut graph = DeploymentGraph::new(Uuid::nil());
        graph.components.push(Component::untyped("web"));
        graph.components.push(Component::untyped("db"));

        let engine = FakeEngine(PLAIN_OUTPUT);
        let layout = compute_layout(
            &engine,
            Path::new("unused.dot"),
            &graph,
            &LayoutConfig::default(),
        )
        .unwrap();
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn test_compute_layout_fails_on_missing_component() {
        let mut graph = DeploymentGraph::new(Uuid::nil());
        graph.components.push(Component::untyped("web"));
        graph.components.push(Component::untyped("cache"));

        let engine = FakeEngine(PLAIN_OUTPUT);
        let err = compute_layout(
            &engine,
            Path::new("unused.dot"),
            &graph,
            &LayoutConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "layout-engine");
        assert!(err.to_string().contains("cache"));
    }
}
