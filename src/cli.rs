//! Command-line host for the investigation views.
//!
//! Renders bundles from disk or investigations from the store, imports
//! bundles, and lists stored threads. Command output is returned as a
//! string; `main` decides where it goes.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::config::{Config, ViewPreferences};
use crate::error::{AppError, AppResult};
use crate::graph::GraphBuilder;
use crate::model::InvestigationBundle;
use crate::storage::{import_bundle, load_bundle, SqliteStorage, Storage};
use crate::views::{EdgeKey, RenderedView, Selection, ViewMode};
use crate::workspace::InvestigationWorkspace;

/// Investigation evidence graph: build and render flow, timeline and map views.
#[derive(Parser, Debug)]
#[command(name = "investigation-graph", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render a bundle file
    Render {
        /// Bundle JSON file (thread, signals, messages)
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Import a bundle file into the database
    Import {
        /// Bundle JSON file (thread, signals, messages)
        #[arg(long)]
        input: PathBuf,
    },

    /// Render a stored investigation
    Show {
        /// Thread ID
        #[arg(long)]
        thread: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// List stored investigations
    Threads,
}

/// Output encoding for rendered views.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// View-model as pretty-printed JSON
    #[default]
    Json,
    /// Plain-text outline
    Text,
}

/// View and selection flags shared by `render` and `show`.
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// View to render: flow, timeline or map (defaults to VIEW_DEFAULT)
    #[arg(long)]
    pub view: Option<ViewMode>,

    /// Selected node ID
    #[arg(long)]
    pub node: Option<String>,

    /// Selected edge as FROM|TO
    #[arg(long)]
    pub edge: Option<EdgeKey>,

    /// Selected path ID
    #[arg(long)]
    pub path: Option<String>,

    /// List and allow selecting dead paths
    #[arg(long)]
    pub show_dead_paths: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl ViewArgs {
    /// Selection requested on the command line.
    pub fn selection(&self) -> Selection {
        Selection {
            selected_node_id: self.node.clone(),
            selected_edge_key: self.edge.clone(),
            selected_path_id: self.path.clone(),
        }
    }

    /// Configured preferences with command-line overrides applied.
    pub fn preferences(&self, defaults: &ViewPreferences) -> ViewPreferences {
        ViewPreferences {
            default_view: self.view.unwrap_or(defaults.default_view),
            show_dead_paths: self.show_dead_paths || defaults.show_dead_paths,
        }
    }
}

/// Build the graph for `bundle` and render the requested view.
pub fn render_bundle(bundle: InvestigationBundle, config: &Config, args: &ViewArgs) -> RenderedView {
    let mut workspace = InvestigationWorkspace::from_bundle(
        GraphBuilder::new(config.graph.clone()),
        bundle,
        &args.preferences(&config.view),
    );
    workspace.controller_mut().set_selection(args.selection());
    workspace.render()
}

/// Encode a rendered view.
pub fn format_view(view: &RenderedView, format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(view).map_err(|e| AppError::Internal {
            message: format!("Failed to encode view: {}", e),
        }),
        OutputFormat::Text => Ok(view.to_string()),
    }
}

/// Execute a CLI command and return its output.
pub async fn execute_command(command: Commands, config: &Config) -> AppResult<String> {
    match command {
        Commands::Render { input, view } => {
            let bundle = InvestigationBundle::load(&input)?;
            info!(path = %input.display(), thread_id = %bundle.thread.id, "Rendering bundle");
            format_view(&render_bundle(bundle, config, &view), view.format)
        }
        Commands::Import { input } => {
            let bundle = InvestigationBundle::load(&input)?;
            let storage = SqliteStorage::new(&config.database).await?;
            let report = import_bundle(&storage, &bundle).await?;
            info!(
                thread_id = %report.thread_id,
                added = report.signals_added,
                rejected = report.signals_rejected,
                "Bundle imported"
            );
            Ok(format!(
                "{} thread {}: {} signals added, {} already stored, {} rejected, {} messages added",
                if report.thread_updated { "Updated" } else { "Created" },
                report.thread_id,
                report.signals_added,
                report.signals_duplicate,
                report.signals_rejected,
                report.messages_added
            ))
        }
        Commands::Show { thread, view } => {
            let storage = SqliteStorage::new(&config.database).await?;
            let bundle = load_bundle(&storage, &thread).await?;
            format_view(&render_bundle(bundle, config, &view), view.format)
        }
        Commands::Threads => {
            let storage = SqliteStorage::new(&config.database).await?;
            list_threads(&storage).await
        }
    }
}

async fn list_threads<S: Storage + ?Sized>(storage: &S) -> AppResult<String> {
    let threads = storage.list_threads().await?;
    if threads.is_empty() {
        return Ok("No investigations stored".to_string());
    }

    let mut output = String::new();
    for thread in &threads {
        let signals = storage.count_thread_signals(&thread.id).await?;
        let assessment = match (thread.current_assessment, thread.confidence_percent()) {
            (Some(a), Some(p)) => format!("{}, {}%", a, p),
            (Some(a), None) => a.to_string(),
            (None, Some(p)) => format!("{}%", p),
            (None, None) => "unassessed".to_string(),
        };
        output.push_str(&format!(
            "{}  {}  [{}]  {} signals  updated {}\n",
            thread.id,
            thread.title,
            assessment,
            signals,
            thread.updated_at.format("%Y-%m-%d %H:%M")
        ));
    }
    Ok(output.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Assessment, InvestigationThread};

    #[test]
    fn test_parse_render_command() {
        let cli = Cli::try_parse_from([
            "investigation-graph",
            "render",
            "--input",
            "bundle.json",
            "--view",
            "map",
            "--edge",
            "s1|s2",
            "--format",
            "text",
        ])
        .unwrap();

        match cli.command {
            Commands::Render { input, view } => {
                assert_eq!(input, PathBuf::from("bundle.json"));
                assert_eq!(view.view, Some(ViewMode::Map));
                assert_eq!(view.edge, Some(EdgeKey::new("s1", "s2")));
                assert_eq!(view.format, OutputFormat::Text);
                assert!(!view.show_dead_paths);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_edge_and_view() {
        let bad_edge =
            Cli::try_parse_from(["investigation-graph", "show", "--thread", "t", "--edge", "s1"]);
        assert!(bad_edge.is_err());

        let bad_view =
            Cli::try_parse_from(["investigation-graph", "show", "--thread", "t", "--view", "gantt"]);
        assert!(bad_view.is_err());
    }

    #[test]
    fn test_preferences_override() {
        let defaults = ViewPreferences {
            default_view: ViewMode::Timeline,
            show_dead_paths: false,
        };
        let args = ViewArgs::default();
        assert_eq!(args.preferences(&defaults), defaults);

        let args = ViewArgs {
            view: Some(ViewMode::Map),
            show_dead_paths: true,
            ..Default::default()
        };
        let prefs = args.preferences(&defaults);
        assert_eq!(prefs.default_view, ViewMode::Map);
        assert!(prefs.show_dead_paths);
    }

    #[tokio::test]
    async fn test_list_threads_output() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        assert_eq!(list_threads(&storage).await.unwrap(), "No investigations stored");

        let thread = InvestigationThread::new("Port strike", "Strike ends this month")
            .with_id("inv-1")
            .with_assessment(Assessment::Unclear, 0.42);
        storage.create_thread(&thread).await.unwrap();

        let output = list_threads(&storage).await.unwrap();
        assert!(output.starts_with("inv-1  Port strike  [unclear, 42%]  0 signals"));
    }
}
