/// Database key that stores the reputation snapshot
pub const REPUTATION_KEY: &[u8] = b"reputation";
