//! i3ipc CLI
//!
//! Run commands against and query a running i3 or sway.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use i3ipc_client::{DecodePolicy, Node, NodeIndex, Session, SessionOptions, Tree};
use miette::IntoDiagnostic;
use tokio::net::UnixStream;

#[derive(Parser, Debug)]
#[command(name = "i3ipc")]
#[command(about = "Talk to i3 or sway over the IPC socket")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/i3ipc/config.kdl")]
    config: String,

    /// Socket path (overrides config and environment)
    #[arg(short, long)]
    socket: Option<String>,

    /// Fail on reply fields with an unexpected type instead of skipping them
    #[arg(long)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an i3 command
    Command {
        /// Command words, joined with spaces
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Print the layout tree
    Tree {
        /// Only print the focused node and its ancestors
        #[arg(long)]
        focused: bool,
    },

    /// List workspaces
    Workspaces,

    /// List outputs
    Outputs,

    /// List marks
    Marks,

    /// List binding modes
    BindingModes,

    /// Show the daemon version
    Version,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();
    let config = i3ipc_config::load_config(&config_path)?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.as_filter())),
        )
        .init();

    let options = SessionOptions {
        decode_policy: if cli.strict || config.decode.strict {
            DecodePolicy::Strict
        } else {
            DecodePolicy::Lenient
        },
        max_payload_size: config.decode.max_payload_size,
    };

    let socket_path = match cli.socket {
        Some(path) => Some(PathBuf::from(shellexpand::tilde(&path).into_owned())),
        None => config.socket_path,
    };

    let mut session = connect(socket_path, options).await?;
    let result = run(&mut session, cli.command).await;
    session.close().await.into_diagnostic()?;
    result
}

async fn connect(
    socket_path: Option<PathBuf>,
    options: SessionOptions,
) -> miette::Result<Session<UnixStream>> {
    let path = match socket_path {
        Some(path) => path,
        None => i3ipc_client::get_socket_path().into_diagnostic()?,
    };
    tracing::debug!("Using socket {}", path.display());
    Session::connect_with_options(&path, options)
        .await
        .into_diagnostic()
}

async fn run(session: &mut Session<UnixStream>, command: Commands) -> miette::Result<()> {
    match command {
        Commands::Command { words } => cmd_command(session, &words.join(" ")).await,
        Commands::Tree { focused } => cmd_tree(session, focused).await,
        Commands::Workspaces => cmd_workspaces(session).await,
        Commands::Outputs => cmd_outputs(session).await,
        Commands::Marks => {
            print_names(session.get_marks().await.into_diagnostic()?);
            Ok(())
        }
        Commands::BindingModes => {
            print_names(session.get_binding_modes().await.into_diagnostic()?);
            Ok(())
        }
        Commands::Version => cmd_version(session).await,
    }
}

async fn cmd_command(session: &mut Session<UnixStream>, command: &str) -> miette::Result<()> {
    let outcomes = session.run_commands(command).await.into_diagnostic()?;

    let mut failed = 0;
    for outcome in &outcomes {
        if outcome.success {
            println!("ok");
        } else {
            failed += 1;
            println!(
                "error: {}",
                outcome.error.as_deref().unwrap_or("command failed")
            );
        }
    }

    if failed > 0 {
        return Err(miette::miette!(
            "{} of {} command(s) failed",
            failed,
            outcomes.len()
        ));
    }
    Ok(())
}

async fn cmd_tree(session: &mut Session<UnixStream>, focused: bool) -> miette::Result<()> {
    let tree = session.get_tree().await.into_diagnostic()?;

    if !focused {
        print_subtree(&tree, tree.root_index(), 0);
        return Ok(());
    }

    let Some(index) = tree.focused() else {
        println!("No focused node");
        return Ok(());
    };
    let Some(node) = tree.node(index) else {
        return Ok(());
    };

    // Outermost ancestor first
    let mut chain: Vec<&Node> = tree.ancestors(index).map(|(_, n)| n).collect();
    chain.reverse();
    chain.push(node);
    for (depth, node) in chain.into_iter().enumerate() {
        println!("{}{}", "  ".repeat(depth), describe(node));
    }
    Ok(())
}

fn print_subtree(tree: &Tree, index: NodeIndex, depth: usize) {
    let Some(node) = tree.node(index) else {
        return;
    };
    println!("{}{}", "  ".repeat(depth), describe(node));
    for child in node.nodes.iter().chain(&node.floating_nodes) {
        print_subtree(tree, *child, depth + 1);
    }
}

fn describe(node: &Node) -> String {
    let mut line = format!("[{}] {:?}", node.id, node.node_type);
    if let Some(name) = &node.name {
        line.push_str(&format!(" \"{}\"", name));
    }
    if let Some(window) = node.window {
        line.push_str(&format!(" window={}", window));
    }
    if matches!(node.floating.as_deref(), Some("user_on" | "auto_on")) {
        line.push_str(" floating");
    }
    if node.focused {
        line.push_str(" *");
    }
    line
}

async fn cmd_workspaces(session: &mut Session<UnixStream>) -> miette::Result<()> {
    let workspaces = session.get_workspaces().await.into_diagnostic()?;

    for ws in &workspaces {
        let mut flags = Vec::new();
        if ws.focused {
            flags.push("focused");
        }
        if ws.visible {
            flags.push("visible");
        }
        if ws.urgent {
            flags.push("urgent");
        }
        println!("{:>3}  {}  on {}  {}", ws.num, ws.name, ws.output, flags.join(","));
    }
    Ok(())
}

async fn cmd_outputs(session: &mut Session<UnixStream>) -> miette::Result<()> {
    let outputs = session.get_outputs().await.into_diagnostic()?;

    for output in &outputs {
        println!("{}", output.name);
        if !output.active {
            println!("  inactive");
            continue;
        }
        println!(
            "  {}x{}+{}+{}{}",
            output.rect.width,
            output.rect.height,
            output.rect.x,
            output.rect.y,
            if output.primary { " primary" } else { "" }
        );
        if let Some(ws) = &output.current_workspace {
            println!("  workspace: {}", ws);
        }
    }
    Ok(())
}

async fn cmd_version(session: &mut Session<UnixStream>) -> miette::Result<()> {
    let version = session.get_version().await.into_diagnostic()?;

    println!("{}", version.human_readable);
    if let Some(config) = &version.loaded_config_file_name {
        println!("Config: {}", config);
    }
    Ok(())
}

fn print_names(names: Vec<String>) {
    for name in names {
        println!("{}", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_payload_cap_matches_client() {
        assert_eq!(
            i3ipc_config::DEFAULT_MAX_PAYLOAD_SIZE,
            i3ipc_client::DEFAULT_MAX_PAYLOAD_SIZE
        );
        assert_eq!(
            i3ipc_config::Config::default().decode.max_payload_size,
            SessionOptions::default().max_payload_size
        );
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from(["i3ipc", "--strict", "--socket", "/tmp/i3.sock", "tree", "--focused"])
            .unwrap();
        assert!(cli.strict);
        assert_eq!(cli.socket.as_deref(), Some("/tmp/i3.sock"));
        assert!(matches!(cli.command, Commands::Tree { focused: true }));
    }
}
