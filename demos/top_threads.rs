use makaba::{rank::DEFAULT_TOP, Client, ThreadQuery};
use simple_logger::SimpleLogger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // setting up logging.
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    // The client loads every board once, then selects /pr/.
    let client = Client::builder().board("pr").build().await?;
    println!("{} boards known, using /{}/", client.boards().len(), client.board().id());

    // Most viewed threads of the active board.
    for thread in client.top_threads(None, "views", DEFAULT_TOP).await? {
        println!(
            "#{} [{} views, {} posts] {}",
            thread.num(),
            thread.views(),
            thread.posts_count(),
            thread.subject()
        );
    }

    // Threads on /b/ tagged with "webm", at most three of them.
    let tagged = client
        .threads(ThreadQuery::new().board("b").tag("webm").limit(3))
        .await?;
    for thread in &tagged {
        println!("webm thread #{}: {}", thread.num(), thread.subject());
    }

    Ok(())
}
