use clap::Parser;
use colored::*;
use docbot::api::{ChatCompletionsModel, ResponsesModel};
use docbot::attachments::load_images;
use docbot::cli::Args;
use docbot::config::{Config, Starter};
use docbot::error::{ChatError, Result};
use docbot::models::Session;
use docbot::session::{
    create_new_session, open_session, FilesystemSessionStore, SessionChoice, SessionHandle, SessionPool,
    SessionStore,
};
use docbot::tools::{ComponentTool, ToolDispatcher, ToolRegistry};
use docbot::ui::{display_starters, TerminalTransport};
use docbot::{Orchestrator, UserInput};
use std::io::Write;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("{} {}", "Error:".red(), e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("DOCBOT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "docbot=debug" } else { "docbot=warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let store = Arc::new(FilesystemSessionStore::new()?);

    // Handle --clear option
    if args.clear_history {
        store.clear_all()?;
        println!("{}", "All conversation history cleared.".green());
        return Ok(());
    }

    let config = Config::from_env_and_args(&args)?;
    init_tracing(config.verbose);

    let session = load_session(&args, &config, store.as_ref())?;
    tracing::info!(
        session = %session.session_id,
        model = %session.settings.model,
        tools = ?session.tools,
        "conversation ready"
    );

    let orchestrator = build_orchestrator(&config, store.clone())?;
    let pool = SessionPool::new(store);
    let handle = pool.open(session);
    let mut transport = TerminalTransport::new(config.max_response_chars);
    let images = load_images(&args.images).await?;

    if !args.command.is_empty() {
        let input = UserInput::text(args.command.join(" ")).with_images(images);
        // Errors were already shown by the transport.
        if orchestrator.handle_turn(&handle, input, &mut transport).await.is_err() {
            process::exit(1);
        }
        return Ok(());
    }

    let starters = config
        .prompt
        .as_ref()
        .map(|p| p.starters.clone())
        .unwrap_or_default();
    repl(&orchestrator, &handle, &mut transport, &starters, images).await
}

fn load_session(args: &Args, config: &Config, store: &dyn SessionStore) -> Result<Session> {
    let choice = match (&args.session_id, args.new_conversation) {
        (Some(id), _) => SessionChoice::Resume(id.as_str()),
        (None, true) => SessionChoice::Fresh,
        (None, false) => SessionChoice::Recent,
    };
    open_session(store, choice, args.model.as_deref(), || {
        create_new_session(config.settings.clone(), config.prompt.as_ref(), config.tools.clone())
    })
}

fn build_orchestrator(config: &Config, store: Arc<FilesystemSessionStore>) -> Result<Orchestrator> {
    let model = Arc::new(ResponsesModel::new(
        &config.api_key,
        config.api_endpoint.clone(),
        config.stream_timeout,
    )?);

    let mut registry = ToolRegistry::new();
    match &config.component {
        Some(component) => {
            let secondary = Arc::new(ChatCompletionsModel::new(
                &component.api_key,
                component.endpoint.clone(),
                component.model.clone(),
            )?);
            registry.register(Arc::new(ComponentTool::new(secondary, config.limits.retry)));
        }
        None => tracing::debug!("component generation disabled"),
    }

    let dispatcher = Arc::new(ToolDispatcher::new(registry, config.retrieval.clone()));
    Ok(Orchestrator::new(model, dispatcher, config.limits.clone()).with_store(store))
}

async fn repl(
    orchestrator: &Orchestrator,
    handle: &SessionHandle,
    transport: &mut TerminalTransport,
    starters: &[Starter],
    mut images: Vec<String>,
) -> Result<()> {
    let session_id = handle.snapshot().await.session_id;
    println!("{}", format!("Conversation {} (Ctrl-D or /exit to quit)", session_id).dimmed());
    display_starters(starters);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/exit" || line == "/quit" {
            break;
        }

        // A bare number picks a starter.
        let text = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| starters.get(i))
            .map(|s| s.message.clone())
            .unwrap_or_else(|| line.to_string());

        // Attachments from the command line go with the first message only.
        let input = UserInput::text(text).with_images(std::mem::take(&mut images));
        match orchestrator.handle_turn(handle, input, transport).await {
            Ok(_) => {}
            Err(ChatError::TurnLimitExceeded { .. }) => break,
            Err(e) => tracing::debug!(error = %e, "turn failed"),
        }
    }

    Ok(())
}
