#[macro_use]
extern crate clap;

use clap::App;
use natsbench::{logging, Config, Runner};
use std::process::exit;
use tracing::error;

#[tokio::main]
async fn main() {
    let yaml = load_yaml!("cli.yaml");
    let matches = App::from_yaml(yaml)
        .version(crate_version!())
        .version_short("v")
        .get_matches();

    // `Config` is required by cli.yaml
    let path = matches.value_of("Config").unwrap_or_default();
    let mut cfg = match Config::load(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", path, e);
            exit(1);
        }
    };
    if let Some(uri) = matches.value_of("Uri") {
        cfg.broker_uri = uri.to_owned();
    }

    if let Err(e) = logging::init(&cfg) {
        eprintln!("{}", e);
        exit(1);
    }

    if let Err(e) = Runner::new(cfg).run().await {
        error!(fatal = true, "{}", e);
        exit(1);
    }
}
