use clap::Parser;

use kvfs_cli::Cli;

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    if let Err(e) = kvfs_cli::run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
