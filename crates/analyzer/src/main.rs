use clap::Parser;
use analyzer::runtime::{boot, cli::Cli, run};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (config, registry) = boot::boot(&cli)?;
    run::run(&cli, &config, &registry)
}
