use std::future::Future;
use std::path::Path;

use crate::errors::AppResult;

use super::chat::{AssetUpload, FileUploader, ThreadHandle};

/// Upload each asset as a reply in `thread`, one at a time and in order.
///
/// Each stream is opened right before its upload. The first failure stops
/// the remaining uploads.
pub async fn attach_assets_to_thread<U, F, Fut>(
    assets: &[String],
    uploader: &U,
    mut open_asset: F,
    thread: &ThreadHandle,
) -> AppResult<()>
where
    U: FileUploader + ?Sized,
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = AppResult<U::Body>>,
{
    let total = assets.len();

    for (index, asset) in assets.iter().enumerate() {
        let filename = asset_file_name(asset);
        log::debug!(
            "Uploading {} ({} of {}) to thread {} in {}",
            asset,
            index + 1,
            total,
            thread.thread_id,
            thread.channel_id
        );

        let file = open_asset(asset).await?;
        uploader
            .upload_file(AssetUpload {
                filename,
                file,
                thread_ts: thread.thread_id.clone(),
                channel_id: thread.channel_id.clone(),
            })
            .await?;
    }

    if total > 0 {
        log::info!("Attached {} asset(s) to thread {}", total, thread.thread_id);
    }
    Ok(())
}

/// Display name of an asset: its base name
pub fn asset_file_name(asset: &str) -> String {
    Path::new(asset)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| asset.to_string())
}
