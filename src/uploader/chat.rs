use async_trait::async_trait;

use crate::errors::AppResult;
use crate::formatter::MessagePayload;

/// Identifies a posted message so replies can attach to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadHandle {
    pub thread_id: String,
    pub channel_id: String,
}

/// Arguments of a single threaded file upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpload<B> {
    pub filename: String,
    pub file: B,
    pub thread_ts: String,
    pub channel_id: String,
}

#[async_trait]
pub trait MessagePoster {
    /// Post a message and return the handle of the thread it starts
    async fn post_message(&self, channel: &str, payload: &MessagePayload)
        -> AppResult<ThreadHandle>;
}

#[async_trait]
pub trait FileUploader {
    /// Readable stream type the uploader consumes
    type Body: Send;

    async fn upload_file(&self, upload: AssetUpload<Self::Body>) -> AppResult<()>;
}
