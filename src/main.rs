use clap::Parser;
use miette::Result;
use tir::cli::{Cli, Commands, GlobalOpts};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Init(args) => tir::cli::commands::init::run(args, &global),
        Commands::Resolve(args) => tir::cli::commands::resolve::run(args, &global),
        Commands::Import(args) => tir::cli::commands::import::run(args, &global),
        Commands::List(args) => tir::cli::commands::list::run(args, &global),
        Commands::Synonym(cmd) => tir::cli::commands::synonym::run(cmd, &global),
        Commands::Status(args) => tir::cli::commands::status::run(args, &global),
        Commands::Changes(args) => tir::cli::commands::changes::run(args, &global),
        Commands::Config(cmd) => tir::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => tir::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr; RUST_LOG wins over the verbosity flags
fn init_logging(global: &GlobalOpts) {
    let level = if global.verbose {
        "info"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
