// Uploader module - posts the failure summary and attaches screenshots
//
// The chat capabilities live behind traits so the notifier can run against fakes

pub mod chat;
pub mod slack_client;
pub mod thread_assets;

pub use chat::{AssetUpload, FileUploader, MessagePoster, ThreadHandle};
pub use slack_client::SlackClient;
pub use thread_assets::attach_assets_to_thread;
