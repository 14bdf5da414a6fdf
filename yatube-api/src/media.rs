use base64::{Engine, prelude::BASE64_STANDARD};
use rand::{Rng, distr::Alphanumeric};
use serde::Deserialize;
use std::{io::ErrorKind, path::PathBuf};
use thiserror::Error;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::{debug, info};

pub const IMAGE_DIR: &str = "posts";
const COLLISION_SUFFIX_LEN: usize = 7;
const FALLBACK_FILE_NAME: &str = "image";
/// Longest stored path, `posts/<name>` included.
const MAX_PATH_LEN: usize = 100;
/// Leaves room for the directory and a collision suffix.
const MAX_FILE_NAME_LEN: usize = MAX_PATH_LEN - IMAGE_DIR.len() - 1 - (COLLISION_SUFFIX_LEN + 1);

/// An image as submitted in a post form: file name plus base64 encoded bytes.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct ImageUpload {
    pub name: String,
    pub data: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Error)]
#[error(
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
)]
pub struct InvalidImageError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Writing media file failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Upload that has been checked to contain a readable image.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct DecodedImage {
    file_name: String,
    bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn decode(upload: &ImageUpload) -> Result<Self, InvalidImageError> {
        let bytes = BASE64_STANDARD
            .decode(upload.data.trim())
            .map_err(|_| InvalidImageError)?;

        let size = imagesize::blob_size(&bytes).map_err(|_| InvalidImageError)?;
        if size.width == 0 || size.height == 0 {
            return Err(InvalidImageError);
        }

        Ok(Self {
            file_name: sanitize_file_name(&upload.name),
            bytes,
        })
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_owned()
    } else {
        truncate_file_name(cleaned)
    }
}

/// Shortens the stem and keeps the extension. `name` must be ASCII.
fn truncate_file_name(name: &str) -> String {
    if name.len() <= MAX_FILE_NAME_LEN {
        return name.to_owned();
    }

    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && extension.len() < MAX_FILE_NAME_LEN / 2 => {
            let stem_len = MAX_FILE_NAME_LEN - extension.len() - 1;
            format!("{}.{extension}", &stem[..stem_len])
        }
        _ => name[..MAX_FILE_NAME_LEN].to_owned(),
    }
}

fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, extension)) => format!("{stem}_{suffix}.{extension}"),
        None => format!("{file_name}_{suffix}"),
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Writes the image below `<root>/posts/` and returns its path relative to the root.
    ///
    /// Existing files are never overwritten; a taken name gets a random suffix.
    pub async fn save(&self, image: &DecodedImage) -> Result<String, MediaError> {
        let dir = self.root.join(IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let mut file_name = image.file_name.clone();
        loop {
            let open = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&file_name))
                .await;

            match open {
                Ok(mut file) => {
                    file.write_all(&image.bytes).await?;
                    file.flush().await?;
                    break;
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!(%file_name, "Media file name taken");
                    let suffix: String = rand::rng()
                        .sample_iter(&Alphanumeric)
                        .take(COLLISION_SUFFIX_LEN)
                        .map(char::from)
                        .collect();
                    file_name = with_suffix(&image.file_name, &suffix);
                }
                Err(err) => return Err(err.into()),
            }
        }

        let relative = format!("{IMAGE_DIR}/{file_name}");
        info!(path = %relative, "Stored post image");
        Ok(relative)
    }

    /// Deletes a file previously returned by [`MediaStorage::save`].
    pub async fn remove(&self, relative: &str) -> Result<(), MediaError> {
        tokio::fs::remove_file(self.root.join(relative)).await?;
        debug!(path = %relative, "Removed post image");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::media::{DecodedImage, ImageUpload, InvalidImageError, MAX_PATH_LEN, MediaStorage};
    use base64::{Engine, prelude::BASE64_STANDARD};

    /// 1x1 GIF.
    pub(crate) const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x21, 0xf9,
        0x04, 0x01, 0x0a, 0x00, 0x01, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
        0x00, 0x02, 0x02, 0x4c, 0x01, 0x00, 0x3b,
    ];

    pub(crate) fn gif_upload(name: &str) -> ImageUpload {
        ImageUpload {
            name: name.to_owned(),
            data: BASE64_STANDARD.encode(SMALL_GIF),
        }
    }

    #[test]
    fn rejects_non_images() {
        let text = ImageUpload {
            name: "notes.txt".to_owned(),
            data: BASE64_STANDARD.encode(b"definitely not an image"),
        };
        assert_eq!(DecodedImage::decode(&text), Err(InvalidImageError));

        let garbage = ImageUpload {
            name: "small.gif".to_owned(),
            data: "%%%not base64%%%".to_owned(),
        };
        assert_eq!(DecodedImage::decode(&garbage), Err(InvalidImageError));
    }

    #[test]
    fn file_names_are_sanitized() {
        let decode = |name: &str| {
            DecodedImage::decode(&gif_upload(name))
                .unwrap()
                .file_name()
                .to_owned()
        };

        assert_eq!(decode("small.gif"), "small.gif");
        assert_eq!(decode("../../etc/passwd"), "passwd");
        assert_eq!(decode("C:\\photos\\my cat.gif"), "mycat.gif");
        assert_eq!(decode("..."), "image");
    }

    #[tokio::test]
    async fn saves_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path().to_owned());
        let image = DecodedImage::decode(&gif_upload("small.gif")).unwrap();

        let first = storage.save(&image).await.unwrap();
        let second = storage.save(&image).await.unwrap();

        assert_eq!(first, "posts/small.gif");
        assert_ne!(first, second);
        assert!(second.starts_with("posts/small_"));
        assert!(second.ends_with(".gif"));
        for relative in [first, second] {
            let stored = std::fs::read(dir.path().join(relative)).unwrap();
            assert_eq!(stored, SMALL_GIF);
        }
    }

    #[tokio::test]
    async fn long_file_names_are_shortened() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path().to_owned());
        let image = DecodedImage::decode(&gif_upload(&format!("{}.gif", "a".repeat(300)))).unwrap();
        assert!(image.file_name().starts_with("aaaa"));
        assert!(image.file_name().ends_with(".gif"));

        let first = storage.save(&image).await.unwrap();
        let second = storage.save(&image).await.unwrap();
        for relative in [&first, &second] {
            assert!(relative.len() <= MAX_PATH_LEN, "{relative}");
            assert!(relative.ends_with(".gif"));
        }
        assert_ne!(first, second);

        let no_extension = DecodedImage::decode(&gif_upload(&"b".repeat(300))).unwrap();
        assert!(storage.save(&no_extension).await.is_ok());
    }

    #[tokio::test]
    async fn removes_saved_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path().to_owned());
        let image = DecodedImage::decode(&gif_upload("small.gif")).unwrap();

        let relative = storage.save(&image).await.unwrap();
        storage.remove(&relative).await.unwrap();

        assert!(!dir.path().join(relative).exists());
    }
}
