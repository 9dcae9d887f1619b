//! proxyharvest Entry Point

use clap::Parser;
use proxyharvest::cli::{check, run, sources, Cli, Commands};
use proxyharvest::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Some(Commands::Check(args)) => match check::execute(&args).await {
            Ok(0) => 1,
            Ok(_) => 0,
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Some(Commands::Sources(args)) => match sources::execute(&args).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Some(Commands::Run(args)) => run_or_exit_code(&args).await,
        None => {
            // No subcommand - default to run
            run_or_exit_code(&run::RunArgs::default()).await
        }
    };

    // ファイル出力をフラッシュしてから終了する
    drop(guard);
    if code != 0 {
        std::process::exit(code);
    }
}

async fn run_or_exit_code(args: &run::RunArgs) -> i32 {
    match run::execute(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}
