use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::io::BufReader;

use botchat::chat::{self, ChatClient, ChatError, ChatSession, ChatState, ChatTransport, Resolution};
use botchat::config::{self, ChatConfig, ConfigError, SocketConfig, Timeouts};
use botchat::socket::{self, SocketError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Failed(String),
}

#[derive(Parser, Debug)]
#[command(name = "botchat", about = "Send chat messages to a bot endpoint and show its replies")]
struct Cli {
    /// Absolute URL that chat messages are POSTed to.
    #[arg(long, env = "BOTCHAT_ENDPOINT")]
    endpoint: Option<String>,

    /// Real-time server URL (ws, wss, http or https).
    #[arg(long, env = "BOTCHAT_SOCKET_URL")]
    socket_url: Option<String>,

    #[arg(long, env = "BOTCHAT_REQUEST_TIMEOUT_SECS", default_value_t = config::DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    #[arg(long, env = "BOTCHAT_CONNECT_TIMEOUT_SECS", default_value_t = config::DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    fn timeouts(&self) -> Timeouts {
        Timeouts { request_secs: self.request_timeout_secs, connect_secs: self.connect_timeout_secs }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat: every input line is sent as a message (default).
    Chat,
    /// Send one message and print the result.
    Send { message: String },
    /// Open the shared real-time connection and report its state.
    Socket(SocketArgs),
}

#[derive(Args, Debug)]
struct SocketArgs {
    /// Print inbound text frames until Ctrl-C or the server closes.
    #[arg(long, default_value_t = false)]
    listen: bool,

    /// Text frame to send once the connection is open.
    #[arg(long)]
    send: Option<String>,

    #[arg(long, default_value_t = 5)]
    wait_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env loaded");
    }

    let cli = Cli::parse();
    match &cli.command {
        None | Some(Command::Chat) => run_chat(&cli).await,
        Some(Command::Send { message }) => run_send(&cli, message).await,
        Some(Command::Socket(args)) => run_socket(&cli, args).await,
    }
}

fn chat_client(cli: &Cli) -> Result<ChatClient, CliError> {
    let config = ChatConfig::new(cli.endpoint.as_deref(), cli.timeouts())?;
    let client = ChatClient::new(&config)?;
    tracing::info!(endpoint = %client.endpoint(), "chat client ready");
    Ok(client)
}

async fn run_chat(cli: &Cli) -> Result<(), CliError> {
    let client = chat_client(cli)?;
    let session = ChatSession::new(Arc::new(client));
    session
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;
    Ok(())
}

async fn run_send(cli: &Cli, message: &str) -> Result<(), CliError> {
    let client = chat_client(cli)?;
    let mut state = ChatState::new();
    state.set_draft(message);
    let submission = state.submit();

    let outcome = client.send(&submission.message).await;
    let resolution = state.resolve(submission.request, outcome);
    print!("{}", chat::view::render(&state));

    if resolution == Resolution::Failed {
        return Err(CliError::Failed(state.error().unwrap_or("request failed").to_owned()));
    }
    Ok(())
}

async fn run_socket(cli: &Cli, args: &SocketArgs) -> Result<(), CliError> {
    let config = SocketConfig::new(cli.socket_url.as_deref())?;
    let manager = socket::install(config)?;

    let connection = socket::get_socket()?;
    tracing::debug!(attempts = manager.connection_attempts(), "shared socket handle acquired");
    let mut inbound = connection.subscribe();
    let ready = connection.wait_ready(Duration::from_secs(args.wait_secs)).await;
    println!("{} {:?}", connection.url(), connection.state());

    if let Err(e) = ready {
        socket::shutdown().await;
        return Err(e.into());
    }

    if let Some(text) = &args.send {
        connection.send_text(text.as_str())?;
    }

    if args.listen {
        loop {
            tokio::select! {
                frame = inbound.recv() => match frame {
                    Ok(text) => println!("{text}"),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "inbound frames dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
                () = connection.closed() => break,
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    }

    socket::shutdown().await;
    Ok(())
}
