use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use reverse_image_search::{
    orchestrator::LogNavigator, server, Completion, Config, ImagePayload, Navigator,
    SearchMatch, SearchOutcome, SearchSession,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "reverse-image-search", version, about = "Upload an image and search it across reverse image search engines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available search engines
    Engines,
    /// Search an image with one engine
    Search {
        /// Engine id (see `engines`)
        #[arg(short, long, default_value = "saucenao_api")]
        engine: String,
        /// Image file to search
        file: PathBuf,
        /// Open redirect targets in the default browser
        #[arg(long, default_value_t = false)]
        open: bool,
    },
    /// Upload an image and print its public URL
    Upload {
        file: PathBuf,
    },
    /// Serve the upload and search endpoints over HTTP
    Serve {
        #[arg(short, long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn open(&self, target: &str) -> reverse_image_search::Result<()> {
        open::that(target)?;
        Ok(())
    }
}

fn print_match(result: &SearchMatch) {
    println!("标题: {}", result.title);
    println!("作者: {}", result.author_name.as_deref().unwrap_or("未知"));
    println!("相似度: {}%", result.similarity);
    println!("缩略图: {}", result.thumbnail_url);
    for link in &result.external_links {
        println!("链接: {}", link);
    }
}

/// Runs one subcommand. Configuration is loaded only by the commands that
/// reach the network, so `engines` works with a broken environment.
async fn run<F>(command: Command, load_config: F) -> Result<()>
where
    F: Fn() -> reverse_image_search::Result<Config>,
{
    match command {
        Command::Engines => {
            for engine in reverse_image_search::EngineRegistry::default().list() {
                println!("{:<14} {:<9} {}", engine.id, engine.mode.to_string(), engine.display_name);
            }
        }
        Command::Search { engine, file, open } => {
            let navigator: Arc<dyn Navigator> = if open {
                Arc::new(BrowserNavigator)
            } else {
                Arc::new(LogNavigator)
            };
            let session = SearchSession::new(load_config()?.services(navigator)?);
            session.select_file(ImagePayload::from_path(&file).await?);

            match session.trigger_search(&engine).await {
                Ok(SearchOutcome::Completed(Completion::Match(best))) => print_match(&best),
                Ok(SearchOutcome::Completed(Completion::NoMatch)) => println!("未找到相似图片"),
                Ok(SearchOutcome::Completed(Completion::Redirected { target })) => {
                    println!("{}", target)
                }
                Ok(SearchOutcome::Stale) => {}
                Err(e) => {
                    log::debug!("{:?}", e);
                    bail!("{}", session.status_message());
                }
            }
        }
        Command::Upload { file } => {
            let config = load_config()?;
            let network = config.network()?;
            let chain = config.upload_chain(&network)?;
            let payload = ImagePayload::from_path(&file).await?;
            println!("{}", chain.resolve_url(&payload).await?.url);
        }
        Command::Serve { addr } => {
            let config = load_config()?;
            let services = config.services(Arc::new(LogNavigator))?;
            server::serve(addr, services, config.max_upload_bytes).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载环境变量
    dotenv::dotenv().ok();

    // 初始化日志
    env_logger::init();

    let cli = Cli::parse();
    run(cli.command, Config::from_env).await
}
