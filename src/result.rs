use crate::error::Error as MakabaErr;
/// Result type of every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, MakabaErr>;
