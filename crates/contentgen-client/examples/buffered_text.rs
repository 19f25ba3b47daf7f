use std::sync::Arc;

use contentgen_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    contentgen_client::config::load_dotenv();

    let transport = Arc::new(HttpTransport::from_env()?);
    let dispatcher = Dispatcher::new(transport.clone()).with_streaming(false);

    let state = dispatcher
        .submit(Request::translate("Buenos días a todos", "English"))
        .await;
    match state.status {
        SessionStatus::Done => println!("{}", state.output),
        _ => eprintln!("run error: {}", state.error.unwrap_or_default()),
    }

    for item in UsageHistory::new(transport).refresh().await {
        println!("{} {} {} tokens", item.created_at, item.task, item.total_tokens);
    }
    Ok(())
}
