use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Parley chat session");

    #[cfg(feature = "local-llm")]
    return run_repl();

    #[cfg(not(feature = "local-llm"))]
    anyhow::bail!("rebuild with the `local-llm` feature to run the chat REPL");
}

#[cfg(feature = "local-llm")]
fn run_repl() -> Result<()> {
    use parley::generate::{LlmConfig, LlmEngine};
    use parley::session::{SessionConfig, SessionController, SubmitOutcome};
    use parley::speech::{QueuedSynthesizer, SpeechQueue};
    use std::io::{self, BufRead, Write};

    let model_id =
        std::env::var("PARLEY_MODEL").unwrap_or_else(|_| LlmConfig::default().model_id);
    info!("loading model: {}", model_id);

    let runtime = tokio::runtime::Runtime::new()?;
    let engine = runtime.block_on(LlmEngine::new(LlmConfig::new(model_id)))?;

    let speech_queue = SpeechQueue::new();
    let synthesizer = QueuedSynthesizer::new(speech_queue.clone());

    let handle = SessionController::start(
        SessionConfig::default(),
        Box::new(engine),
        Box::new(synthesizer),
    )?;
    let mut snapshots = handle.subscribe();

    println!("Type a message and press enter; empty line quits.");
    let stdin = io::stdin();
    let mut printed = 0usize;

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        if handle.submit_text(line)? == SubmitOutcome::RejectedBusy {
            println!("(busy, try again)");
            continue;
        }

        // Wait for the turn to finish, then print what it added.
        let final_snapshot = runtime.block_on(async {
            loop {
                if snapshots.changed().await.is_err() {
                    return None;
                }
                let snapshot = snapshots.borrow().clone();
                if snapshot.is_ready() && snapshot.messages.len() > printed {
                    return Some(snapshot);
                }
            }
        });

        let Some(snapshot) = final_snapshot else { break };
        for message in &snapshot.messages[printed..] {
            if !message.is_from_user() {
                println!("{}", message.display_text());
            }
        }
        printed = snapshot.messages.len();

        while let Some(utterance) = speech_queue.dequeue() {
            info!(chars = utterance.len(), "speech output dispatched");
        }
    }

    handle.shutdown()?;
    Ok(())
}
