use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use ui_test_agent::{
    AgentLoop, AnthropicClient, BrowserSettings, BrowserTool, ChromeLauncher, RunConfig, RunMode,
    ScriptWriterTool, TaskDefinition, Termination, Tool, ToolRegistry, Verdict, initial_prompt,
    system_prompt,
};

/// Let a language model execute or plan an end-to-end UI test in a real browser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Task definition file
    #[arg(short, long, value_name = "FILE", default_value = "test.txt")]
    task: PathBuf,

    /// Execute the test case, or explore the site and write a test plan
    #[arg(short, long, value_enum, default_value_t = RunMode::Execute)]
    mode: RunMode,

    /// Dispatch the tool calls of one turn concurrently
    #[arg(long)]
    concurrent: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => {
            println!("\x1b[32mTest Passed\x1b[0m");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("\x1b[31mTest Failed\x1b[0m");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = RunConfig::from_env()?;
    let task = TaskDefinition::from_file(&cli.task)?;
    log::info!("Task '{}' on {} ({} mode)", task.label, task.website_url, cli.mode);

    let today = chrono::Local::now().date_naive();
    let mut options = config.agent_options(system_prompt(cli.mode, today))?;
    options.concurrent_dispatch = cli.concurrent;

    let mut driver = ChromeLauncher::new().headless(config.headless);
    if let Some(path) = &config.chrome_path {
        driver = driver.with_executable(path);
    }
    let browser = BrowserTool::new(
        Arc::new(driver),
        BrowserSettings::new(&task.website_url, &config.screenshot_dir)
            .with_viewport(config.viewport)
            .with_screenshot_delay(config.screenshot_delay),
    );
    let script_writer = ScriptWriterTool::new(&config.script_dir)
        .with_context(|| format!("preparing {}", config.script_dir.display()))?;

    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(browser), Arc::new(script_writer)];
    let registry = ToolRegistry::register(tools)?;
    let client = AnthropicClient::new(&options)?;
    let agent = AgentLoop::new(Box::new(client), registry, &options);

    let outcome = agent
        .run(&initial_prompt(&task, cli.mode))
        .await
        .context("starting tools")?;
    log::info!(
        "Run finished after {} turn(s), {} message(s)",
        outcome.turns,
        outcome.conversation.len()
    );

    match outcome.termination {
        Termination::Verdict(text) => {
            println!("{}", text);
            Ok(Verdict::from_text(&text).is_pass())
        }
        Termination::TransportFailure(message) => {
            anyhow::bail!("model call failed: {}", message)
        }
    }
}
