use chartsnap::cli::Cli;
use chartsnap::config::SnapConfig;
use chartsnap::logging::init_logging;
use chartsnap::output::{self, BannerObserver, OutputContext};
use chartsnap::render::HelmRenderer;
use chartsnap::runner::Orchestrator;
use chartsnap::SnapError;
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.debug) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let ctx = OutputContext::from_args(&cli);
    let config = SnapConfig::from_cli(&cli);
    let renderer = HelmRenderer::new(config.helm_path.clone(), config.render_timeout);

    let report = match Orchestrator::new(&config, &renderer).run(&BannerObserver::new(&ctx)) {
        Ok(report) => report,
        Err(e) => handle_error(&e, &ctx),
    };

    output::print_summary(&ctx, &report);
    if !report.all_passed() {
        std::process::exit(1);
    }
}

/// Report a run-level error and exit.
///
/// With --json the structured form goes to stderr; otherwise a
/// human-readable message with its hint.
fn handle_error(err: &SnapError, ctx: &OutputContext) -> ! {
    if ctx.is_json() {
        let json = err.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        eprintln!("{}", ctx.error_text(err));
    }
    std::process::exit(err.exit_code());
}
