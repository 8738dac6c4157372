/// UI module
///
/// - `studio.rs` - prompt, settings and generated image list
/// - `diagnostics.rs` - diagnostic log panel
/// - `thumbnails.rs` - fetched previews for the image list
/// - `boundary.rs` - error boundary around the studio region

pub mod boundary;
pub mod diagnostics;
pub mod studio;
pub mod thumbnails;
