use anyhow::Context;
use clap::Parser;
use livy_notebook::{Notebook, NotebookConfig, Payload, ResultKind, SourceKind, TypedResult};
use std::io::Read;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Livy server URL, overrides the configuration file
    #[arg(short, long)]
    url: Option<String>,

    /// Language of the source: scala, python, r or sql
    #[arg(short, long, default_value = "scala")]
    language: SourceKind,

    /// Run every language on one shared session with this key
    #[arg(long)]
    shared_session: Option<String>,

    /// Print table cells in full
    #[arg(long)]
    no_truncate: bool,

    /// Source file to run, read from stdin when omitted
    file: Option<PathBuf>,
}

fn print_result(result: &TypedResult) {
    match (&result.kind, &result.payload) {
        (ResultKind::Error, _) => eprintln!("{}", result.data()),
        (_, Payload::Binary { media_type, data }) => {
            println!("[{} image, {} bytes base64]", media_type, data.len())
        }
        (_, Payload::Text(text)) => println!("{}", text),
    }
    if result.truncated {
        println!("(output truncated)");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NotebookConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NotebookConfig::default(),
    };
    if let Some(url) = args.url {
        config.livy.url = url;
    }
    if args.shared_session.is_some() {
        config.execution.shared_session_key = args.shared_session;
    }
    if args.no_truncate {
        config.execution.enable_field_truncation = false;
    }

    let code = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut code = String::new();
            std::io::stdin().read_to_string(&mut code)?;
            code
        }
    };

    let notebook = Notebook::connect(config).await?;

    let run = notebook.run(args.language, &code);
    tokio::pin!(run);
    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            signal = tokio::signal::ctrl_c() => {
                signal?;
                warn!("Interrupted, cancelling the running statement");
                notebook.cancel(args.language).await?;
            }
        }
    };

    for typed in &result.results {
        print_result(typed);
    }
    notebook.close().await?;

    if let Some(kind) = result.failure {
        warn!("Run failed: {:?}", kind);
        std::process::exit(1);
    }
    Ok(())
}
