// SPDX-License-Identifier: MIT OR Apache-2.0
//! `nodeflow_inspect` - headless node graph inspector.
//!
//! Loads a saved scene with the built-in node types and reports:
//! - Nodes with their type and port counts
//! - Connections
//! - Acyclicity, connectivity and a topological order
//!
//! ```text
//! nodeflow_inspect <scene.json> [--config <graph.ron>] [--save <out.json>]
//! nodeflow_inspect --types
//! ```

use nodeflow_graph::delegates::register_standard;
use nodeflow_graph::{
    ConfigError, DagGraphModel, DelegateRegistry, GraphConfig, GraphDocument, GraphModel, LoadError, NodeAttribute,
    NodeRole, PortType,
};
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Errors that end the inspector
#[derive(Debug, thiserror::Error)]
enum InspectError {
    /// Bad command line
    #[error("{0}\nusage: nodeflow_inspect <scene.json> [--config <graph.ron>] [--save <out.json>] | --types")]
    Usage(String),

    /// Reading or writing a file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The scene could not be loaded
    #[error("Failed to load scene: {0}")]
    Load(#[from] LoadError),

    /// The scene could not be written
    #[error("Failed to write scene: {0}")]
    Save(#[from] serde_json::Error),

    /// The settings file could not be read
    #[error("Failed to read config: {0}")]
    Config(#[from] ConfigError),
}

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    scene: Option<PathBuf>,
    config: Option<PathBuf>,
    save: Option<PathBuf>,
    list_types: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, InspectError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => parsed.config = Some(Self::value(&mut args, "--config")?),
                "--save" => parsed.save = Some(Self::value(&mut args, "--save")?),
                "--types" => parsed.list_types = true,
                flag if flag.starts_with("--") => {
                    return Err(InspectError::Usage(format!("unknown option {flag}")));
                }
                _ if parsed.scene.is_some() => {
                    return Err(InspectError::Usage(format!("unexpected argument {arg}")));
                }
                _ => parsed.scene = Some(PathBuf::from(arg)),
            }
        }
        if parsed.scene.is_none() && !parsed.list_types {
            return Err(InspectError::Usage("missing scene file".to_string()));
        }
        Ok(parsed)
    }

    fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<PathBuf, InspectError> {
        args.next()
            .map(PathBuf::from)
            .ok_or_else(|| InspectError::Usage(format!("{flag} needs a path")))
    }
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nodeflow_inspect=info,nodeflow_graph=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = Args::parse(std::env::args().skip(1)).and_then(run) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), InspectError> {
    let config = match &args.config {
        Some(path) => GraphConfig::load(path)?,
        None => GraphConfig::default(),
    };

    let mut registry = DelegateRegistry::with_default_category(config.default_category.clone());
    register_standard(&mut registry);
    let registry = Rc::new(registry);
    if args.list_types {
        for (category, names) in registry.types_by_category() {
            println!("{category}: {}", names.join(", "));
        }
    }

    let Some(scene) = args.scene else {
        return Ok(());
    };
    let text = std::fs::read_to_string(&scene).map_err(|source| InspectError::Io {
        path: scene.clone(),
        source,
    })?;
    let document = GraphDocument::from_json_str(&text)?;

    let mut model = DagGraphModel::with_config(registry, config);
    model.load(&document)?;
    tracing::info!(
        "Loaded {} with {} nodes and {} connections",
        scene.display(),
        model.node_count(),
        model.connection_count()
    );

    report(&model);

    if let Some(path) = args.save {
        let text = model.save().to_json_string()?;
        std::fs::write(&path, text).map_err(|source| InspectError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!("Saved scene to {}", path.display());
    }
    Ok(())
}

fn report(model: &DagGraphModel) {
    println!("nodes:");
    for node_id in model.all_node_ids() {
        let type_name = match model.node_data(node_id, NodeRole::Type) {
            Some(NodeAttribute::Type(name)) => name,
            _ => String::from("?"),
        };
        println!(
            "  {node_id}: {type_name} ({} in, {} out)",
            model.port_count(node_id, PortType::In),
            model.port_count(node_id, PortType::Out)
        );
    }

    println!("connections:");
    for id in model.all_connections() {
        println!("  {id}");
    }

    let order: Vec<String> = model.topological_order().iter().map(ToString::to_string).collect();
    println!("acyclic: {}", !model.is_cyclic());
    println!("connected: {}", model.is_connected());
    println!("order: {}", order.join(" -> "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeflow_graph::delegates::create_standard_registry;

    fn args(raw: &[&str]) -> Result<Args, InspectError> {
        Args::parse(raw.iter().map(ToString::to_string))
    }

    #[test]
    fn test_parse_scene_and_options() {
        let parsed = args(&["scene.json", "--config", "graph.ron", "--save", "out.json"]).unwrap();
        assert_eq!(parsed.scene, Some(PathBuf::from("scene.json")));
        assert_eq!(parsed.config, Some(PathBuf::from("graph.ron")));
        assert_eq!(parsed.save, Some(PathBuf::from("out.json")));
        assert!(!parsed.list_types);
    }

    #[test]
    fn test_parse_rejects_bad_command_lines() {
        assert!(matches!(args(&[]), Err(InspectError::Usage(_))));
        assert!(matches!(args(&["a.json", "b.json"]), Err(InspectError::Usage(_))));
        assert!(matches!(args(&["a.json", "--config"]), Err(InspectError::Usage(_))));
        assert!(matches!(args(&["--verbose"]), Err(InspectError::Usage(_))));
        assert!(args(&["--types"]).is_ok());
    }

    #[test]
    fn test_demo_scene_loads() {
        let text = include_str!("../scenes/demo.json");
        let document = GraphDocument::from_json_str(text).unwrap();
        let mut model = DagGraphModel::new(Rc::new(create_standard_registry()));
        model.load(&document).unwrap();

        assert!(model.is_connected());
        assert!(!model.is_cyclic());
        assert_eq!(model.node_count(), 4);
        assert_eq!(model.connection_count(), 3);
    }
}
