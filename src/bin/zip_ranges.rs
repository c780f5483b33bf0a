use clap::Parser;
use dealer_harvest::core::zipcodes;
use dealer_harvest::utils::logger;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zip_ranges")]
#[command(about = "Write one ZIP code JSON file per state from USPS prefix ranges")]
struct Args {
    /// Output directory for <STATE>.json files
    #[arg(short, long, default_value = "zipcode")]
    output: PathBuf,

    /// Comma separated state abbreviations (default: all, including DC)
    #[arg(long, value_delimiter = ',')]
    states: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    match zipcodes::write_state_files(&args.output, &args.states) {
        Ok(written) => {
            println!(
                "✅ Wrote {} state files to {}",
                written.len(),
                args.output.display()
            );
        }
        Err(e) => {
            tracing::error!("❌ {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code().max(1));
        }
    }
}
