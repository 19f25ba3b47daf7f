//! Command-line front end for the content generation service.
//!
//! ```bash
//! contentgen --task summarize "Long article text..."
//! contentgen --task translate --target-language French "Good morning"
//! echo "a haiku about rust" | contentgen --task generate --no-stream
//! contentgen --history
//! ```
//!
//! Streamed text goes to stdout as it arrives; status, usage and logs go to
//! stderr. Ctrl-C cancels the request in flight.

use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use contentgen_client::config::load_dotenv;
use contentgen_client::observability::init_observability;
use contentgen_client::prelude::*;
use tokio::io::AsyncReadExt as _;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "contentgen", version, about, long_about = None)]
struct Args {
    /// Text to process; read from stdin when omitted
    text: Option<String>,

    /// Operation to run (summarize, translate, generate)
    #[arg(short, long, default_value = "summarize")]
    task: Task,

    /// Target language, required for translate
    #[arg(short = 'l', long, value_name = "LANGUAGE")]
    target_language: Option<String>,

    /// Sampling temperature in [0, 1]
    #[arg(long)]
    temperature: Option<f64>,

    /// Completion token budget
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Wait for the whole response instead of streaming it
    #[arg(long)]
    no_stream: bool,

    /// Print the service's recent usage list and exit
    #[arg(long)]
    history: bool,

    /// Service root URL
    #[arg(long, env = "CONTENTGEN_API_BASE_URL", value_name = "URL")]
    base_url: Option<String>,
}

impl Args {
    fn request(&self, input_text: String) -> Request {
        let mut options = RequestOptions::default();
        if let Some(temperature) = self.temperature {
            options = options.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            options = options.max_tokens(max_tokens);
        }
        let request = Request::new(self.task, input_text).options(options);
        match &self.target_language {
            Some(language) => request.target_language(language.clone()),
            None => request,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    load_dotenv();
    init_observability();
    let args = Args::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &args.base_url {
        config = config.base_url(base_url.clone());
    }
    let prefer_streaming = config.streaming && !args.no_stream;
    let transport = Arc::new(HttpTransport::new(config)?);

    if args.history {
        return print_history(transport).await;
    }

    let input_text = match &args.text {
        Some(text) => text.clone(),
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(transport).with_streaming(prefer_streaming));
    info!(
        event = "cli.submit",
        domain = "cli",
        task = %args.task,
        mode = ?dispatcher.transport_mode()
    );

    let renderer = tokio::spawn(render(dispatcher.subscribe()));
    let mut running = {
        let dispatcher = dispatcher.clone();
        let request = args.request(input_text);
        tokio::spawn(async move { dispatcher.submit(request).await })
    };

    let state = tokio::select! {
        joined = &mut running => joined?,
        _ = tokio::signal::ctrl_c() => {
            dispatcher.cancel();
            running.await?
        }
    };
    renderer.await?;

    Ok(report(&state))
}

/// Prints output as it accumulates until the session leaves `Streaming`.
async fn render(mut rx: watch::Receiver<SessionState>) {
    let mut printed = 0;
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if state.output.len() > printed {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(state.output[printed..].as_bytes());
            let _ = stdout.flush();
            printed = state.output.len();
        }
        if state.status != SessionStatus::Streaming {
            break;
        }
    }
    if printed > 0 {
        println!();
    }
}

fn report(state: &SessionState) -> ExitCode {
    match state.status {
        SessionStatus::Done => {
            if let Some(meta) = &state.meta {
                eprintln!(
                    "[{}] model={} tokens={} (prompt {}, completion {}) cost=${:.6}",
                    meta.task,
                    meta.model,
                    meta.usage.total_tokens,
                    meta.usage.prompt_tokens,
                    meta.usage.completion_tokens,
                    meta.usage.estimated_cost
                );
            }
            ExitCode::SUCCESS
        }
        SessionStatus::Error => {
            eprintln!(
                "error: {}",
                state.error.as_deref().unwrap_or("request failed")
            );
            ExitCode::FAILURE
        }
        SessionStatus::Idle | SessionStatus::Streaming => {
            eprintln!("cancelled");
            ExitCode::from(130)
        }
    }
}

async fn print_history(
    transport: Arc<HttpTransport>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let history = UsageHistory::new(transport);
    let items = history.refresh().await;
    if items.is_empty() {
        eprintln!("no recent usage");
        return Ok(ExitCode::SUCCESS);
    }
    for item in &items {
        println!("{}", serde_json::to_string(item)?);
    }
    Ok(ExitCode::SUCCESS)
}
