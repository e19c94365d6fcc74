use tracing_subscriber::EnvFilter;

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = buildlens::commands::run_cli(args)?;
    println!("{output}");
    Ok(())
}

fn main() {
    // diagnostics go to stderr; stdout stays pure JSON for callers
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
