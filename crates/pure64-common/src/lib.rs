/// Algorithms (currently: CRC-32 hashing).
pub mod alg;
/// On-disk partition table wire types.
pub mod part;
/// Fixed-width string encodings.
pub mod str;
/// Endian-aware primitive types.
pub mod types;
/// GPT mixed-endian UUID text parsing/formatting.
pub mod uuid;
