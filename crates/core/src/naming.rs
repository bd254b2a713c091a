//! Filename generation
//!
//! The adapter asks a `FilenameGenerator` for the target filename of every
//! upload. The generator has one asynchronous signature; synchronous
//! functions and fixed names are adapted through explicit constructors.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use rand::Rng;

use crate::record::FileRecord;

/// Future returned by a filename generator
pub type FilenameFuture = BoxFuture<'static, anyhow::Result<String>>;

type GenerateFn = dyn Fn(&FileRecord, usize) -> FilenameFuture + Send + Sync;

/// Capability producing a target filename for an upload attempt
///
/// The second argument is the attempt index; the adapter always passes 0.
#[derive(Clone)]
pub struct FilenameGenerator {
    inner: Arc<GenerateFn>,
}

impl FilenameGenerator {
    /// Wrap an asynchronous generator
    ///
    /// The returned future must not borrow the record; copy whatever it
    /// needs before the `async` block.
    pub fn new<F, Fut>(generate: F) -> Self
    where
        F: Fn(&FileRecord, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |file: &FileRecord, index: usize| -> FilenameFuture {
                generate(file, index).boxed()
            }),
        }
    }

    /// Wrap a synchronous generator
    pub fn from_fn<F>(generate: F) -> Self
    where
        F: Fn(&FileRecord, usize) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |file: &FileRecord, index: usize| -> FilenameFuture {
                future::ready(generate(file, index)).boxed()
            }),
        }
    }

    /// Always produce the same filename
    pub fn fixed(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self::from_fn(move |_, _| Ok(filename.clone()))
    }

    /// Random hex name keeping the source extension
    pub fn random() -> Self {
        Self::from_fn(random_filename)
    }

    /// The host's original filename, suffixed with the index on retries
    pub fn original() -> Self {
        Self::from_fn(original_filename)
    }

    pub fn generate(&self, file: &FileRecord, index: usize) -> FilenameFuture {
        (self.inner)(file, index)
    }
}

impl Default for FilenameGenerator {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Debug for FilenameGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilenameGenerator").finish_non_exhaustive()
    }
}

/// 32 hex characters from 16 random bytes, plus the record's extension
pub fn random_filename(file: &FileRecord, _index: usize) -> anyhow::Result<String> {
    let bytes: [u8; 16] = rand::rng().random();
    let stem = hex::encode(bytes);
    Ok(match file.extension() {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    })
}

/// Original name of the upload; index `n > 0` yields `name-n.ext`
pub fn original_filename(file: &FileRecord, index: usize) -> anyhow::Result<String> {
    let name = match &file.original_name {
        Some(name) => name.clone(),
        None => file
            .local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no original filename for {}",
                    file.local_path.display()
                )
            })?,
    };

    if index == 0 {
        return Ok(name);
    }

    let path = Path::new(&name);
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(match path.extension() {
        Some(ext) => format!("{stem}-{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{index}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_random_filename_keeps_extension() {
        let record = FileRecord::new("/tmp/upload_1").with_original_name("cat.png");
        let name = FilenameGenerator::random()
            .generate(&record, 0)
            .await
            .unwrap();

        let (stem, ext) = name.split_once('.').unwrap();
        assert_eq!(ext, "png");
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_filename_without_extension() {
        let record = FileRecord::new("/tmp/upload_1");
        let name = random_filename(&record, 0).unwrap();
        assert_eq!(name.len(), 32);
        assert_ne!(name, random_filename(&record, 0).unwrap());
    }

    #[test]
    fn test_original_filename() {
        let record = FileRecord::new("/tmp/upload_1").with_original_name("report.final.pdf");
        assert_eq!(original_filename(&record, 0).unwrap(), "report.final.pdf");
        assert_eq!(original_filename(&record, 2).unwrap(), "report.final-2.pdf");

        let record = FileRecord::new("/tmp/README");
        assert_eq!(original_filename(&record, 0).unwrap(), "README");
        assert_eq!(original_filename(&record, 1).unwrap(), "README-1");
    }

    #[test]
    fn test_original_filename_without_any_name() {
        let record = FileRecord::new("/");
        assert!(original_filename(&record, 0).is_err());
    }

    #[tokio::test]
    async fn test_fixed_generator() {
        let generator = FilenameGenerator::fixed("abc.png");
        let record = FileRecord::new("/tmp/whatever.jpg");
        assert_eq!(generator.generate(&record, 0).await.unwrap(), "abc.png");
        assert_eq!(generator.generate(&record, 3).await.unwrap(), "abc.png");
    }

    #[tokio::test]
    async fn test_async_generator_sees_record() {
        let generator = FilenameGenerator::new(|file: &FileRecord, index| {
            let size = file.size.unwrap_or_default();
            async move {
                tokio::task::yield_now().await;
                Ok(format!("{size}-{index}.bin"))
            }
        });

        let record = FileRecord::new("/tmp/blob").with_size(512);
        assert_eq!(generator.generate(&record, 0).await.unwrap(), "512-0.bin");
    }

    #[tokio::test]
    async fn test_generator_error_passes_through() {
        let generator =
            FilenameGenerator::from_fn(|_, _| Err(anyhow::anyhow!("name service down")));
        let err = generator
            .generate(&FileRecord::default(), 0)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "name service down");
    }
}
