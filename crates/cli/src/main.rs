//! AgentDeck CLI
//!
//! Thin terminal collaborator for the session core: renders whatever the
//! projections expose and forwards typed input as chat. All protocol and
//! lifecycle behavior lives in `agentdeck-session`.

use anyhow::Context;
use clap::Parser;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use agentdeck_protocol::{Envelope, FileTreeNode, Sender};
use agentdeck_session::{Session, SessionConfig, SessionError};

#[derive(Parser)]
#[command(
    name = "agentdeck",
    about = "Talk to the AgentDeck workbench agent from the terminal"
)]
struct Args {
    /// Backend base URL; ws(s)://host/ws is derived from it
    #[arg(
        long,
        env = "AGENTDECK_SERVER_URL",
        default_value = "http://127.0.0.1:8001"
    )]
    server_url: String,

    /// Log filter (tracing syntax); logs go to stderr
    #[arg(long, env = "AGENTDECK_LOG", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log))
        .with_writer(std::io::stderr)
        .init();

    let config = SessionConfig::new(&args.server_url).context("invalid server url")?;
    let session = Session::connect(config).context("failed to start session")?;

    info!(
        component = "cli",
        event = "cli.started",
        server_url = %args.server_url,
        "AgentDeck CLI started"
    );

    for message in session.chat().messages() {
        render_chat_line(&message.content, message.sender);
    }
    println!(
        "{}",
        style("Type a task, or /help for commands.").dim().italic()
    );

    // Render inbound traffic alongside the projections.
    let mut printer = session.router().subscribe(Box::new(|envelope| {
        render_envelope(envelope);
        Ok(())
    }));

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                None => break,
                Some(line) => {
                    if !handle_line(&session, &line) {
                        break;
                    }
                }
            },
        }
    }

    printer.dispose();
    session.teardown();
    println!("{}", style("Session ended.").dim());
    Ok(())
}

/// One parsed line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    Help,
    Files,
    Refresh,
    Active,
    Status,
    Clear,
    Open(&'a str),
    /// `/open` with no path; never forwarded as chat.
    OpenUsage,
    Chat(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => Input::Empty,
        "/quit" | "/exit" => Input::Quit,
        "/help" => Input::Help,
        "/files" => Input::Files,
        "/refresh" => Input::Refresh,
        "/active" => Input::Active,
        "/status" => Input::Status,
        "/clear" => Input::Clear,
        _ => match trimmed.strip_prefix("/open") {
            Some(rest) if rest.is_empty() => Input::OpenUsage,
            Some(rest) if rest.starts_with(char::is_whitespace) => {
                let path = rest.trim();
                if path.is_empty() {
                    Input::OpenUsage
                } else {
                    Input::Open(path)
                }
            }
            _ => Input::Chat(trimmed),
        },
    }
}

/// Returns false when the user asked to quit.
fn handle_line(session: &Session, line: &str) -> bool {
    match parse_input(line) {
        Input::Empty => {}
        Input::Quit => return false,
        Input::Help => {
            println!("  /files          show the workspace tree");
            println!("  /open <path>    open a file and fetch its content");
            println!("  /refresh        ask the backend to rescan the tree");
            println!("  /active         list files the agent is touching");
            println!("  /status         show current agent status");
            println!("  /clear          reset the transcript");
            println!("  /quit           leave");
        }
        Input::Files => {
            let tree = session.file_tree().tree();
            if tree.is_empty() {
                println!("{}", style("(workspace tree is empty)").dim());
            } else {
                print_tree(&tree, 0);
            }
        }
        Input::Refresh => report_send(session.refresh_file_tree()),
        Input::Active => {
            let mut files: Vec<_> = session.active_files().files().into_iter().collect();
            files.sort();
            if files.is_empty() {
                println!("{}", style("(no active files)").dim());
            }
            for path in files {
                println!("  {}", style(path).yellow());
            }
        }
        Input::Status => {
            let record = session.status().current();
            println!(
                "  {:?} {}",
                style(record.status).magenta(),
                style(record.action).dim()
            );
        }
        Input::Clear => {
            session.clear_chat();
            println!("{}", style("(transcript cleared)").dim());
        }
        Input::Open(path) => report_send(session.select_file(path)),
        Input::OpenUsage => println!("{}", style("usage: /open <path>").dim()),
        Input::Chat(text) => {
            if let Err(e) = session.send_chat(text) {
                report_failure(e);
            }
        }
    }
    true
}

fn report_send(result: Result<(), SessionError>) {
    if let Err(e) = result {
        report_failure(e);
    }
}

/// A failed send is shown as a local system-style line. No automatic retry;
/// the connection heals itself and the user resends when ready.
fn report_failure(error: SessionError) {
    println!(
        "{}",
        style(format!("[system] {} (message not sent)", error))
            .yellow()
            .dim()
    );
}

fn render_envelope(envelope: &Envelope) {
    match envelope {
        Envelope::Chat { content, sender, .. } => render_chat_line(content, *sender),
        Envelope::Error { message } => {
            println!("{}", style(format!("[error] {}", message)).red());
        }
        Envelope::Status { status, action } => {
            println!(
                "{}",
                style(format!("[status] {:?} {}", status, action)).dim()
            );
        }
        Envelope::FileTree { tree } => {
            println!(
                "{}",
                style(format!(
                    "[workspace] tree updated ({} top-level entries); /files to view",
                    tree.len()
                ))
                .dim()
            );
        }
        Envelope::ActiveFiles { files } => {
            println!(
                "{}",
                style(format!("[workspace] agent touching {} file(s)", files.len())).dim()
            );
        }
        Envelope::SelectFile { path } => {
            println!("{}", style(format!("[open] {}", path)).cyan());
        }
        Envelope::FileContent { path, content } => {
            println!("{}", style(format!("── {} ──", path)).cyan().bold());
            println!("{}", content);
            println!("{}", style("──────").cyan());
        }
        // Outbound-only tags never arrive.
        Envelope::GetFileContent { .. } | Envelope::RefreshFileTree => {}
    }
}

fn render_chat_line(content: &str, sender: Sender) {
    let line = match sender {
        Sender::User => style(format!("you> {}", content)).cyan(),
        Sender::Assistant => style(format!("agent> {}", content)).green(),
        Sender::System => style(format!("[system] {}", content)).yellow(),
    };
    println!("{}", line);
}

fn print_tree(nodes: &[FileTreeNode], depth: usize) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        match node.kind {
            agentdeck_protocol::NodeKind::Directory => {
                println!("{}{}/", indent, style(&node.name).blue().bold());
                print_tree(&node.children, depth + 1);
            }
            agentdeck_protocol::NodeKind::File => {
                println!("{}{}", indent, node.name);
            }
        }
    }
}
