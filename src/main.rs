use anyhow::Context;
use clap::Parser;

use cypress_slack_notifier::action;
use cypress_slack_notifier::collector::FsWalker;
use cypress_slack_notifier::config::{self, Cli};
use cypress_slack_notifier::errors::AppError;
use cypress_slack_notifier::notifier::{Notifier, RunOutcome};
use cypress_slack_notifier::uploader::SlackClient;

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(config::parse_log_level(&cli.resolved_log_level()))
        .parse_default_env()
        .init();

    log::info!("Starting cypress-slack-notifier v{}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(outcome) => {
            let message = outcome.result_message();
            log::info!("{}", message);
            if let Err(e) = action::set_output("result", &message) {
                log::warn!("Failed to write result output: {}", e);
            }
        }
        Err(e) => {
            let message = format!("{:#}", e);
            log::error!("{}", message);
            if e
                .downcast_ref::<AppError>()
                .is_some_and(AppError::is_credential_error)
            {
                log::error!("Check the token and channel inputs of this step");
            }
            println!("{}", action::error_annotation(&message));
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<RunOutcome> {
    let config = config::load_config(cli)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        log::debug!("Initializing Slack client");
        let client =
            SlackClient::from_config(&config).context("Failed to initialize Slack client")?;

        let notifier = Notifier::new(config, FsWalker, client);
        let outcome = notifier.run().await?;
        Ok::<_, anyhow::Error>(outcome)
    })
}
