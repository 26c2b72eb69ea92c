// geocart - command-line driver
// Licensed under AGPL v3

use std::io;

use clap::Parser;
use geocart::config::Config;
use geocart::input::read_geodetic;
use geocart::output::{report_writer, ConversionReport, Report, RoundTripReport};
use tracing::{debug, error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose || config.trace);

    if let Err(e) = run(&config) {
        error!("{}", e);
        return Err(e);
    }
    Ok(())
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let ellipsoid = config.ellipsoid()?;
    let solver = config.solver_config()?;
    debug!(
        "Ellipsoid a={} b={}, solver {} (tolerance {:e}, max {} iterations)",
        ellipsoid.a(),
        ellipsoid.b(),
        solver.method,
        solver.tolerance,
        solver.max_iterations
    );

    let report = match config.cartesian_point() {
        Some(point) => Report::Conversion(ConversionReport::build(point, &ellipsoid, &solver)?),
        None => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut prompt = io::stdout();
            let entered = read_geodetic(config.lat, config.lon, config.height, &mut input, &mut prompt)?;
            info!(
                "Round-tripping ({}, {}, {})",
                entered.latitude, entered.longitude, entered.height
            );
            Report::RoundTrip(RoundTripReport::build(entered, &ellipsoid, &solver)?)
        }
    };

    let mut writer = report_writer(config.format, io::stdout());
    writer.write_report(&report)?;
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    if verbose {
        subscriber
            .with_max_level(tracing::Level::DEBUG)
            .init();
        debug!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber
            .with_max_level(tracing::Level::INFO)
            .init();
    }
}
