//! Constants shared by the compiler stages.

/// Largest arity circomlib's `Poseidon(n)` template is instantiated with.
pub const POSEIDON_MAX_INPUTS: usize = 16;

/// circomlib comparators decompose into `n + 1` bits and require `n <= 252`.
pub const MAX_COMPARATOR_BITS: u32 = 252;

/// Upper bound accepted for the configurable merkle depth limit.
pub const MAX_MERKLE_DEPTH: u32 = 64;

pub const DEFAULT_COMPARATOR_BITS: u32 = 32;
pub const DEFAULT_MAX_MERKLE_DEPTH: u32 = 32;
pub const DEFAULT_TEMPLATE_NAME: &str = "CustomCircuit";
pub const DEFAULT_CIRCOM_VERSION: &str = "2.0.0";
pub const DEFAULT_INCLUDE_ROOT: &str = "circomlib/circuits";

/// First line of every stub returned instead of circuit source.
pub const PLACEHOLDER_HEADER: &str = "// circuit-builder: compilation blocked";

/// Domain tag mixed into the emitted-source digest.
pub const SOURCE_DIGEST_DOMAIN_TAG: &[u8] = b"CIRCUIT-BUILDER-SOURCE-V1";

/// Identifiers the emitter never hands out: circom keywords, the loop
/// variable used by merkle folding, and `main`.
pub const RESERVED_IDENTIFIERS: &[&str] = &[
    "signal",
    "input",
    "output",
    "public",
    "template",
    "component",
    "var",
    "function",
    "return",
    "if",
    "else",
    "for",
    "while",
    "do",
    "log",
    "assert",
    "include",
    "pragma",
    "circom",
    "custom_templates",
    "parallel",
    "bus",
    "main",
    "i",
];
