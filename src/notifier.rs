use std::future::Future;
use std::path::Path;

use crate::collector::{collect_matches, DirectoryWalker, LOG_GLOB, SCREENSHOT_GLOB};
use crate::config::Config;
use crate::errors::AppResult;
use crate::formatter::format_failures_as_blocks;
use crate::parser::{parse_fail_logs, LogDocument};
use crate::uploader::{attach_assets_to_thread, FileUploader, MessagePoster};

pub const NO_FAILURES_RESULT: &str = "No failures logged found so no action taken!";

/// How a successful run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoFailures,
    Reported {
        failures: usize,
        screenshots: usize,
        channel: String,
    },
}

impl RunOutcome {
    /// Message surfaced to the CI host as the `result` output
    pub fn result_message(&self) -> String {
        match self {
            RunOutcome::NoFailures => NO_FAILURES_RESULT.to_string(),
            RunOutcome::Reported { channel, .. } => format!(
                "Failure messages and any screenshots have now been sent to your `{}` channel in Slack!",
                channel
            ),
        }
    }
}

/// Collects failures from the workdir and reports them to the chat channel
pub struct Notifier<W, C> {
    config: Config,
    walker: W,
    client: C,
}

impl<W, C> Notifier<W, C>
where
    W: DirectoryWalker,
    C: MessagePoster + FileUploader<Body = tokio::fs::File>,
{
    pub fn new(config: Config, walker: W, client: C) -> Self {
        Self {
            config,
            walker,
            client,
        }
    }

    pub async fn run(&self) -> AppResult<RunOutcome> {
        let workdir = self.config.workdir.as_path();

        log::debug!("Checking for screenshots and logs in {}", workdir.display());
        let screenshots = collect_matches(&self.walker, workdir, SCREENSHOT_GLOB)?;
        let logs = collect_matches(&self.walker, workdir, LOG_GLOB)?;

        log::info!(
            "There were {} errors based on the files present.",
            logs.len()
        );
        if logs.is_empty() {
            log::debug!("No failures found!");
            return Ok(RunOutcome::NoFailures);
        }
        log::info!("The log files found were: {}", logs.join(", "));

        let documents = read_logs(workdir, &logs).await?;
        let failures = parse_fail_logs(&documents, self.config.malformed_logs)?;
        let payload =
            format_failures_as_blocks(&failures, &self.config.message_text, screenshots.len());

        let thread = self
            .client
            .post_message(&self.config.channel, &payload)
            .await?;

        attach_assets_to_thread(
            &screenshots,
            &self.client,
            |asset: &str| open_asset(workdir, asset),
            &thread,
        )
        .await?;

        Ok(RunOutcome::Reported {
            failures: failures.len(),
            screenshots: screenshots.len(),
            channel: self.config.channel.clone(),
        })
    }
}

async fn read_logs(workdir: &Path, logs: &[String]) -> AppResult<Vec<LogDocument>> {
    let mut documents = Vec::with_capacity(logs.len());
    for log_path in logs {
        let contents = tokio::fs::read(workdir.join(log_path)).await?;
        documents.push(LogDocument {
            path: log_path.clone(),
            contents,
        });
    }
    Ok(documents)
}

fn open_asset(workdir: &Path, asset: &str) -> impl Future<Output = AppResult<tokio::fs::File>> {
    let path = workdir.join(asset);
    async move { Ok(tokio::fs::File::open(path).await?) }
}
