//! rTomcat-Exporter - Tomcat metrics exporter
//!
//! This binary provides a Prometheus-compatible metrics endpoint
//! that collects Tomcat metrics via Jolokia.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use rtomcat_exporter::cli::Cli;
use rtomcat_exporter::config::Config;
use rtomcat_exporter::registry::PrometheusFormatter;
use rtomcat_exporter::server;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    rtomcat_exporter::init_logging(&cli.log_level.to_string())?;

    let mut config = if cli.validate {
        Config::load(&cli.config)?
    } else {
        Config::load_or_default(&cli.config)?
    };
    cli.apply_to(&mut config);
    config.validate()?;

    if cli.validate {
        println!("Configuration is valid");
        return Ok(());
    }

    if cli.dry_run {
        let mbean_server = server::connect(&config)?;
        let registry = server::build_registry(&config, mbean_server);
        let families = registry.gather().await;
        print!("{}", PrometheusFormatter::new().format(&families));
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        jolokia = %config.jolokia.url,
        "Starting rTomcat-Exporter"
    );

    server::run(config).await?;

    Ok(())
}
