mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, cloud, directory, report, scan};
use discovr_common::config::Config;
use discovr_core::export::ExportFormat;
use terminal::{logging::LogSession, print};

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();
    let cfg = commands.config();
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

    let session = match LogSession::start(&cfg, commands.command.feature(), &timestamp) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!("logging to {:?}", session.path());

    print::banner(cfg.no_banner, cfg.quiet);

    let code = match run(&commands, &cfg, timestamp).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            discovr_common::error!("{e:#}");
            ExitCode::FAILURE
        }
    };
    print::closing_rule();
    drop(session);
    code
}

async fn run(commands: &CommandLine, cfg: &Config, timestamp: String) -> anyhow::Result<()> {
    let opts = report::ReportOptions {
        formats: match &commands.export {
            Some(list) => ExportFormat::parse_list(list)?,
            None => Vec::new(),
        },
        out_dir: commands.out_dir(),
        timestamp,
    };
    let feature = commands.command.feature();

    match &commands.command {
        Commands::Scan(args) => {
            print::section("starting scanner", cfg.quiet);
            let inventory = scan::scan(args, cfg).await?;
            report::report(feature, "network scan", inventory, &opts, cfg)
        }
        Commands::Cloud { provider } => {
            print::section("collecting cloud inventory", cfg.quiet);
            let inventory = cloud::cloud(provider, cfg).await;
            report::report(feature, "cloud inventory", inventory, &opts, cfg)
        }
        Commands::Directory(args) => {
            print::section("querying directory", cfg.quiet);
            let inventory = directory::directory(args, cfg).await;
            report::report(feature, "directory computers", inventory, &opts, cfg)
        }
    }
}
