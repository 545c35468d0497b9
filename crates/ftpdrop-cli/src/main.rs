use ftpdrop_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    let cfg = match cli.load_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("ftpdrop error: {:#}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = logging::init_logging(cfg.log_file.as_deref()) {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    if let Err(err) = cli.dispatch(cfg).await {
        tracing::error!("{:#}", err);
        eprintln!("ftpdrop error: {:#}", err);
        std::process::exit(1);
    }
}
