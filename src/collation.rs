/// A collation id, as negotiated in the handshake and reported in column
/// metadata.
///
/// Only the collations a client plausibly connects with are named here; any
/// id can be wrapped directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collation(pub u16);

impl Collation {
    pub const LATIN1_SWEDISH_CI: Collation = Collation(8);
    pub const UTF8MB3_GENERAL_CI: Collation = Collation(33);
    pub const UTF8MB4_GENERAL_CI: Collation = Collation(45);
    pub const BINARY: Collation = Collation(63);
    pub const UTF8MB4_UNICODE_CI: Collation = Collation(224);
    pub const UTF8MB4_0900_AI_CI: Collation = Collation(255);

    pub(crate) fn from_name(name: &str) -> Option<Collation> {
        Some(match name {
            "latin1_swedish_ci" => Collation::LATIN1_SWEDISH_CI,
            "utf8_general_ci" | "utf8mb3_general_ci" => Collation::UTF8MB3_GENERAL_CI,
            "utf8mb4_general_ci" => Collation::UTF8MB4_GENERAL_CI,
            "binary" => Collation::BINARY,
            "utf8mb4_unicode_ci" => Collation::UTF8MB4_UNICODE_CI,
            "utf8mb4_0900_ai_ci" => Collation::UTF8MB4_0900_AI_CI,
            _ => return None,
        })
    }
}
