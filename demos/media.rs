use std::env;

use makaba::{media::Category, Client};
use simple_logger::SimpleLogger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    // usage: media [board] [category] [out_dir]
    let mut args = env::args().skip(1);
    let board = args.next().unwrap_or_else(|| "b".to_string());
    let category = args.next().unwrap_or_else(|| "video".to_string());
    let out_dir = args.next().unwrap_or_else(|| "downloads".to_string());

    let category = Category::named(&category)
        .ok_or_else(|| anyhow::anyhow!("unknown category: {category}"))?;

    let client = Client::builder()
        .board(board)
        .concurrent(true)
        .workers(4)
        .build()
        .await?;

    let Some(thread) = client.top_threads(None, "posts", 1).await?.pop() else {
        println!("/{}/ has no threads", client.board().id());
        return Ok(());
    };
    println!("downloading {category} from #{}: {}", thread.num(), thread.subject());

    match client
        .download_thread_media(&thread, &out_dir, category)
        .await?
    {
        Some(report) => {
            for path in report.downloaded() {
                println!("saved {}", path.display());
            }
            for (path, err) in report.failures() {
                eprintln!("failed {}: {}", path.display(), err);
            }
        }
        None => println!("nothing matched {category}"),
    }

    Ok(())
}
