use clap::Parser;
use farm_records::cli::{
    handle_activities, handle_application, handle_crop, handle_farm, handle_records,
    handle_reset, handle_summary, Cli, Commands, StoreLocation,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let location = StoreLocation::new(cli.data_dir, cli.config);

    let result = match cli.command {
        Commands::Farm(cmd) => handle_farm(&location, cmd.action),
        Commands::Application(cmd) => handle_application(&location, cmd.action),
        Commands::Crop(cmd) => handle_crop(&location, cmd.action),
        Commands::Records {
            query,
            farm,
            from,
            to,
            kind,
            json,
        } => handle_records(&location, query, farm, from, to, kind, json),
        Commands::Activities { limit, json } => handle_activities(&location, limit, json),
        Commands::Summary { json } => handle_summary(&location, json),
        Commands::Reset { force, json } => handle_reset(&location, force, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
