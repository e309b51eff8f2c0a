mod args;
mod logging;

use std::process;
use std::sync::Arc;

use tracing::{error, info};

use lotkeeper::ParkingService;
use lotkeeper::transport::serve;

use crate::args::{USAGE, parse_args};

fn main() {
    let argv: Vec<String> = std::env::args().collect();

    let args = match parse_args(&argv) {
        Ok(args) if args.help => {
            println!("{USAGE}");
            return;
        }
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!();
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    let startup = match args.into_startup() {
        Ok(startup) => startup,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(2);
        }
    };

    logging::init_tracing();
    info!("lotkeeper {}", lotkeeper::LOTKEEPER_VERSION);

    if let Err(e) = run(startup) {
        error!(error = %e, "lotkeeper exited with error");
        process::exit(1);
    }
}

fn run(startup: args::Startup) -> anyhow::Result<()> {
    let service = ParkingService::from_config(&startup.lot)?;
    for lot in service.manager().usage() {
        info!(category = %lot.category, capacity = lot.capacity, "Lot configured");
    }
    info!(hourly_rate = service.hourly_rate(), "Fee policy");

    let runtime = tokio::runtime::Runtime::new()?;
    let reason = runtime.block_on(serve(startup.server, Arc::new(service)))?;
    info!(%reason, "lotkeeper stopped");
    Ok(())
}
