/// Saving files chosen through native dialogs
///
/// Generated images are fetched over HTTP, their format is sniffed from
/// the bytes, and the user picks the destination.

use std::path::PathBuf;

use crate::error::DownloadError;

const FILENAME_PREFIX: &str = "bando-fi-generated";
const FALLBACK_EXTENSION: &str = "jpg";

/// An image the user asked to save
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    /// Position in history, newest first
    pub index: usize,
}

/// `bando-fi-generated-{index+1}.{ext}`
pub fn suggested_filename(index: usize, extension: &str) -> String {
    format!("{}-{}.{}", FILENAME_PREFIX, index + 1, extension)
}

/// File extension for the image bytes, `jpg` when unrecognised
pub fn extension_for(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or(FALLBACK_EXTENSION)
}

/// Raw bytes of a generated image
pub async fn fetch_image(url: &str) -> Result<Vec<u8>, DownloadError> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Fetch the image and write it wherever the user chooses
pub async fn save_image(request: DownloadRequest) -> Result<PathBuf, DownloadError> {
    let bytes = fetch_image(&request.url).await?;
    let filename = suggested_filename(request.index, extension_for(&bytes));

    let handle = rfd::AsyncFileDialog::new()
        .set_title("Save Generated Image")
        .set_file_name(filename)
        .save_file()
        .await
        .ok_or(DownloadError::Cancelled)?;

    let path = handle.path().to_path_buf();
    tokio::fs::write(&path, &bytes).await?;
    Ok(path)
}

/// Write a log export wherever the user chooses.
/// Returns `None` when the dialog is dismissed.
pub async fn save_log_export(contents: String) -> Result<Option<PathBuf>, DownloadError> {
    let Some(handle) = rfd::AsyncFileDialog::new()
        .set_title("Export Diagnostic Logs")
        .set_file_name("bando-fi-logs.json")
        .add_filter("JSON", &["json"])
        .save_file()
        .await
    else {
        return Ok(None);
    };

    write_export(handle.path().to_path_buf(), contents)
        .await
        .map(Some)
}

async fn write_export(path: PathBuf, contents: String) -> Result<PathBuf, DownloadError> {
    tokio::fs::write(&path, contents)
        .await
        .map_err(|err| DownloadError::Export(err.to_string()))?;
    Ok(path)
}
