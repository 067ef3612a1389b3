use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio_util::io::ReaderStream;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::formatter::MessagePayload;

use super::chat::{AssetUpload, FileUploader, MessagePoster, ThreadHandle};

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    ok: bool,
    upload_url: Option<String>,
    file_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompleteUploadResponse {
    ok: bool,
    error: Option<String>,
}

/// Slack Web API client posting the summary and uploading thread replies
pub struct SlackClient {
    client: Client,
    api_base: String,
    token: String,
}

impl SlackClient {
    pub fn new(token: &str, api_base: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cypress-slack-notifier/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(&config.token, &config.slack_api_base, config.request_timeout)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn decode<T: DeserializeOwned>(method: &str, response: Response) -> AppResult<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::slack_api(
                method,
                format!("HTTP {}: {}", status, truncate(&error_text, 300)),
            ));
        }

        let body = response.text().await?;
        log::debug!(
            "Slack {} response (first 300 chars): {}",
            method,
            truncate(&body, 300)
        );
        Ok(serde_json::from_str(&body)?)
    }

    async fn request_upload_url(&self, filename: &str, length: u64) -> AppResult<(String, String)> {
        const METHOD: &str = "files.getUploadURLExternal";

        let response = self
            .client
            .post(self.endpoint(METHOD))
            .bearer_auth(&self.token)
            .form(&[("filename", filename.to_string()), ("length", length.to_string())])
            .send()
            .await?;

        let parsed: UploadUrlResponse = Self::decode(METHOD, response).await?;
        if !parsed.ok {
            return Err(AppError::slack_api(METHOD, error_or_unknown(parsed.error)));
        }

        let upload_url = non_blank(parsed.upload_url)
            .ok_or_else(|| AppError::slack_api(METHOD, "response missing upload_url"))?;
        let file_id = non_blank(parsed.file_id)
            .ok_or_else(|| AppError::slack_api(METHOD, "response missing file_id"))?;

        Ok((upload_url, file_id))
    }

    async fn send_file_bytes(
        &self,
        upload_url: &str,
        filename: &str,
        file: tokio::fs::File,
        length: u64,
    ) -> AppResult<()> {
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .client
            .post(upload_url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, length)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::upload_failed(format!(
                "Slack rejected bytes of {} with status {}: {}",
                filename,
                status,
                truncate(&error_text, 300)
            )));
        }
        Ok(())
    }

    async fn complete_upload(
        &self,
        file_id: &str,
        filename: &str,
        channel_id: &str,
        thread_ts: &str,
    ) -> AppResult<()> {
        const METHOD: &str = "files.completeUploadExternal";

        let files = json!([{ "id": file_id, "title": filename }]).to_string();
        let response = self
            .client
            .post(self.endpoint(METHOD))
            .bearer_auth(&self.token)
            .form(&[
                ("files", files.as_str()),
                ("channel_id", channel_id),
                ("thread_ts", thread_ts),
            ])
            .send()
            .await?;

        let parsed: CompleteUploadResponse = Self::decode(METHOD, response).await?;
        if !parsed.ok {
            return Err(AppError::slack_api(METHOD, error_or_unknown(parsed.error)));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagePoster for SlackClient {
    async fn post_message(
        &self,
        channel: &str,
        payload: &MessagePayload,
    ) -> AppResult<ThreadHandle> {
        const METHOD: &str = "chat.postMessage";

        let body = json!({
            "channel": channel,
            "text": payload.text,
            "blocks": payload.blocks,
        });

        let response = self
            .client
            .post(self.endpoint(METHOD))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let parsed: PostMessageResponse = Self::decode(METHOD, response).await?;
        if !parsed.ok {
            return Err(AppError::slack_api(METHOD, error_or_unknown(parsed.error)));
        }

        let thread_id = non_blank(parsed.ts)
            .ok_or_else(|| AppError::slack_api(METHOD, "response missing ts"))?;
        let channel_id = non_blank(parsed.channel).unwrap_or_else(|| channel.to_string());

        log::info!("Posted failure summary to {} (ts {})", channel_id, thread_id);
        Ok(ThreadHandle {
            thread_id,
            channel_id,
        })
    }
}

#[async_trait]
impl FileUploader for SlackClient {
    type Body = tokio::fs::File;

    async fn upload_file(&self, upload: AssetUpload<tokio::fs::File>) -> AppResult<()> {
        let AssetUpload {
            filename,
            file,
            thread_ts,
            channel_id,
        } = upload;

        let length = file.metadata().await?.len();
        if length == 0 {
            return Err(AppError::upload_failed(format!("{} is empty", filename)));
        }

        let (upload_url, file_id) = self.request_upload_url(&filename, length).await?;
        self.send_file_bytes(&upload_url, &filename, file, length)
            .await?;
        self.complete_upload(&file_id, &filename, &channel_id, &thread_ts)
            .await?;

        log::debug!("Uploaded {} as {} to thread {}", filename, file_id, thread_ts);
        Ok(())
    }
}

fn error_or_unknown(error: Option<String>) -> String {
    error.unwrap_or_else(|| "unknown error".to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
