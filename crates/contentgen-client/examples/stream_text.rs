use std::sync::Arc;

use contentgen_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    contentgen_client::config::load_dotenv();
    contentgen_client::observability::init_observability();

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(HttpTransport::from_env()?)));
    let mut rx = dispatcher.subscribe();
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            print!("{}", &state.output[printed.min(state.output.len())..]);
            printed = state.output.len();
            if state.status != SessionStatus::Streaming {
                break;
            }
        }
        println!();
    });

    let state = dispatcher
        .submit(Request::generate("Write two sentences about tide pools."))
        .await;
    let _ = printer.await;

    match state.meta {
        Some(meta) => eprintln!("{} tokens via {}", meta.usage.total_tokens, meta.model),
        None => eprintln!("run error: {}", state.error.unwrap_or_default()),
    }
    Ok(())
}
