use timeline_app::app::{run, AppConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err:#}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(config) {
        eprintln!("Failed to render timeline: {err:#}");
        std::process::exit(1);
    }
}
