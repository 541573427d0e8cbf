// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Init, Ls, Mkdir, User};
use guard_daemon::{process, AppState};

command_enum! {
    (Init, Init),
    (User, User),
    (Ls, Ls),
    (Mkdir, Mkdir),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Before `init` there is no config yet; log at the default level
    let config = AppState::load(args.path.clone())
        .map(|state| state.config)
        .unwrap_or_default();
    let guards = process::init_logging(process::log_level(&config), config.log_dir.as_deref());

    let ctx = cli::op::OpContext::new(args.path);

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    // flush pending log lines before exiting
    drop(guards);
    std::process::exit(code);
}
