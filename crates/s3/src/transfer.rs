//! Transfer tuning
//!
//! Concurrency and chunking knobs for uploads, plus the part arithmetic
//! used by multipart uploads.

/// Default chunk size: 8 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Minimum chunk size accepted by COS: 1 MiB
pub const MIN_CHUNK_SIZE: u64 = 1024 * 1024;

/// Maximum chunk size: 5 GiB
pub const MAX_CHUNK_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts per upload
pub const MAX_PARTS: usize = 10_000;

/// Files at least this large are uploaded in parts: 20 MiB
pub const DEFAULT_SLICE_THRESHOLD: u64 = 20 * 1024 * 1024;

pub const DEFAULT_FILE_PARALLEL_LIMIT: usize = 3;
pub const DEFAULT_CHUNK_PARALLEL_LIMIT: usize = 3;

/// Upload concurrency and chunking configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Files uploaded at the same time by one client
    pub file_parallel_limit: usize,

    /// Parts of one file uploaded at the same time
    pub chunk_parallel_limit: usize,

    /// Part size in bytes
    pub chunk_size: u64,

    /// Size from which multipart upload is used
    pub slice_threshold: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            file_parallel_limit: DEFAULT_FILE_PARALLEL_LIMIT,
            chunk_parallel_limit: DEFAULT_CHUNK_PARALLEL_LIMIT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            slice_threshold: DEFAULT_SLICE_THRESHOLD,
        }
    }
}

impl TransferConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_parallel_limit(mut self, n: usize) -> Self {
        self.file_parallel_limit = n.max(1);
        self
    }

    pub fn chunk_parallel_limit(mut self, n: usize) -> Self {
        self.chunk_parallel_limit = n.max(1);
        self
    }

    pub fn chunk_size(mut self, size: u64) -> Self {
        self.chunk_size = size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        self
    }

    pub fn slice_threshold(mut self, size: u64) -> Self {
        self.slice_threshold = size;
        self
    }

    /// Apply the builder's bounds to values set directly on the fields
    ///
    /// Parallel limits are at least 1 and the chunk size stays within
    /// `MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE`.
    pub fn normalized(self) -> Self {
        Self {
            file_parallel_limit: self.file_parallel_limit.max(1),
            chunk_parallel_limit: self.chunk_parallel_limit.max(1),
            chunk_size: self.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE),
            slice_threshold: self.slice_threshold,
        }
    }

    /// Whether a file of `file_size` bytes goes through multipart upload
    pub fn use_multipart(&self, file_size: u64) -> bool {
        file_size > 0 && file_size >= self.slice_threshold
    }

    /// Part size for a file, grown if needed to stay within `MAX_PARTS`
    pub fn calculate_part_size(&self, file_size: u64) -> u64 {
        let chunk_size = self.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        let parts = file_size.div_ceil(chunk_size);

        if parts <= MAX_PARTS as u64 {
            chunk_size
        } else {
            let required_size = file_size.div_ceil(MAX_PARTS as u64);
            required_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
        }
    }
}

/// Calculate number of parts for a file
pub fn calculate_parts(file_size: u64, part_size: u64) -> usize {
    file_size.div_ceil(part_size) as usize
}

/// Byte range `[start, end)` of a 1-based part
pub fn part_byte_range(part_number: i32, part_size: u64, total_size: u64) -> (u64, u64) {
    let start = (part_number as u64 - 1) * part_size;
    let end = (start + part_size).min(total_size);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransferConfig::default();
        assert_eq!(config.file_parallel_limit, 3);
        assert_eq!(config.chunk_parallel_limit, 3);
        assert_eq!(config.chunk_size, 8 * 1024 * 1024);
    }

    #[test]
    fn test_config_builder() {
        let config = TransferConfig::new()
            .chunk_size(16 * 1024 * 1024)
            .chunk_parallel_limit(6)
            .file_parallel_limit(0);

        assert_eq!(config.chunk_size, 16 * 1024 * 1024);
        assert_eq!(config.chunk_parallel_limit, 6);
        assert_eq!(config.file_parallel_limit, 1);
    }

    #[test]
    fn test_chunk_size_clamping() {
        let config = TransferConfig::new().chunk_size(1024);
        assert_eq!(config.chunk_size, MIN_CHUNK_SIZE);

        let config = TransferConfig::new().chunk_size(10 * 1024 * 1024 * 1024);
        assert_eq!(config.chunk_size, MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_normalized_fixes_zero_fields() {
        let config = TransferConfig {
            file_parallel_limit: 0,
            chunk_parallel_limit: 0,
            chunk_size: 0,
            slice_threshold: 0,
        }
        .normalized();

        assert_eq!(config.file_parallel_limit, 1);
        assert_eq!(config.chunk_parallel_limit, 1);
        assert_eq!(config.chunk_size, MIN_CHUNK_SIZE);
        assert_eq!(config.slice_threshold, 0);

        assert_eq!(TransferConfig::default().normalized(), TransferConfig::default());
    }

    #[test]
    fn test_calculate_part_size_zero_chunk_size() {
        let config = TransferConfig {
            chunk_size: 0,
            ..Default::default()
        };
        let size = config.calculate_part_size(20 * 1024 * 1024);
        assert_eq!(size, MIN_CHUNK_SIZE);
        assert_eq!(calculate_parts(20 * 1024 * 1024, size), 20);
    }

    #[test]
    fn test_use_multipart() {
        let config = TransferConfig::default();
        assert!(!config.use_multipart(0));
        assert!(!config.use_multipart(DEFAULT_SLICE_THRESHOLD - 1));
        assert!(config.use_multipart(DEFAULT_SLICE_THRESHOLD));

        let config = TransferConfig::new().slice_threshold(0);
        assert!(!config.use_multipart(0));
        assert!(config.use_multipart(1));
    }

    #[test]
    fn test_calculate_part_size_keeps_chunk_size() {
        let config = TransferConfig::default();
        let size = config.calculate_part_size(100 * 1024 * 1024);
        assert_eq!(size, DEFAULT_CHUNK_SIZE);
        assert_eq!(calculate_parts(100 * 1024 * 1024, size), 13);
    }

    #[test]
    fn test_calculate_part_size_huge_file() {
        let config = TransferConfig::default();
        let huge_file = DEFAULT_CHUNK_SIZE * 20_000;
        let size = config.calculate_part_size(huge_file);
        assert!(size > DEFAULT_CHUNK_SIZE);
        assert!(calculate_parts(huge_file, size) <= MAX_PARTS);
    }

    #[test]
    fn test_part_byte_range() {
        assert_eq!(part_byte_range(1, 100, 250), (0, 100));
        assert_eq!(part_byte_range(2, 100, 250), (100, 200));
        assert_eq!(part_byte_range(3, 100, 250), (200, 250));
    }
}
