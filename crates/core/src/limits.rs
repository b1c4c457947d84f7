//! Size limits for uploads and questions.

/// Maximum uploaded image size in bytes (10MB).
pub const MAX_UPLOAD_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Extra body allowance for multipart boundaries and headers.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Maximum question length in characters.
///
/// The model truncates at 128 tokens; this bounds the request well above that.
pub const MAX_QUESTION_LEN: usize = 512;

/// Maximum length of a stored file extension, without the dot.
pub const MAX_EXTENSION_LEN: usize = 8;
