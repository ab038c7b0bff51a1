use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use job_apply_agent::clients::MemoryJobStore;
use job_apply_agent::config::Config;
use job_apply_agent::logger;
use job_apply_agent::models::{load_profile, JobParams, JobType};
use job_apply_agent::orchestrator::{JobQueue, ScrapeCoordinator};
use job_apply_agent::utils::logging::log_startup;
use job_apply_agent::workflow::{ApplyFlow, BrowserApplySession, ProgressSink};

#[derive(Parser)]
#[command(name = "job-apply-agent", about = "职位抓取与 Easy Apply 自动申请")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 运行一个抓取 / 导入任务并等待结束
    Scrape {
        /// jsearch-import | listing-scrape | listing-scrape-easy-apply-only
        #[arg(long)]
        kind: JobType,
        #[arg(long)]
        query: String,
        #[arg(long)]
        location: String,
    },
    /// 申请一个职位
    Apply {
        #[arg(long)]
        url: String,
        /// 申请人资料（TOML）
        #[arg(long)]
        profile: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logger::init_with_verbose(config.verbose_logging);

    match cli.command {
        Command::Scrape {
            kind,
            query,
            location,
        } => run_scrape(&config, kind, query, location).await,
        Command::Apply { url, profile } => run_apply(&config, &url, &profile).await,
    }
}

async fn run_scrape(config: &Config, kind: JobType, query: String, location: String) -> Result<()> {
    log_startup(config, kind.as_str());

    let store = Arc::new(MemoryJobStore::new());
    let coordinator = Arc::new(ScrapeCoordinator::new(config, store.clone()));
    let queue = JobQueue::new(config, coordinator);

    let handle = queue.start_job(kind, JobParams { query, location })?;
    info!("任务已提交: {}", handle.id);

    while queue.is_running(&handle.id) {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    println!("{}", serde_json::to_string_pretty(&queue.status())?);
    println!("{}", serde_json::to_string_pretty(&store.postings())?);
    Ok(())
}

async fn run_apply(config: &Config, url: &str, profile_path: &Path) -> Result<()> {
    log_startup(config, "apply");

    let profile = load_profile(profile_path).await?;
    let flow = ApplyFlow::new(config);
    let mut session = BrowserApplySession::new(config, flow.classifier().markers());

    let (sink, mut events) = ProgressSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{}", line);
            }
        }
    });

    let outcome = flow.run(&mut session, url, &profile, &sink).await;
    drop(sink);
    let _ = printer.await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
