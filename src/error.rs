use thiserror::Error;

/// The error type for all fallible tree, map, set, and cursor operations.
///
/// [`Exhausted`](Error::Exhausted) is a control signal rather than a defect:
/// a cursor stepping past either end of its tree reports it so that callers
/// can stop, and it keeps being reported until the cursor is repositioned.
/// Every other variant describes a caller-visible contract violation at the
/// point of the offending operation; nothing is retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// A point lookup, removal, or cursor `goto` named a key that is not in
    /// the tree.
    #[error("key not found")]
    KeyNotFound,

    /// `min`, `max`, or `pop` was called on an empty tree.
    #[error("tree is empty")]
    EmptyTree,

    /// A rank access was outside the tree, after negative-offset
    /// normalization.
    #[error("offset {offset} out of range for length {len}")]
    IndexOutOfRange { offset: isize, len: usize },

    /// The comparator failed to produce an ordering outcome. Comparators are
    /// validated lazily, so this surfaces at the first comparison the
    /// malformed comparator performs.
    #[error("comparator produced no ordering")]
    BadComparator,

    /// A construction sequence was not uniformly pair-shaped, or a durable
    /// form carried entries out of ascending order.
    #[error("input is not a well-formed entry sequence")]
    MalformedInput,

    /// A cursor stepped past the end of its traversal direction.
    #[error("cursor exhausted")]
    Exhausted,

    /// A durable form named a comparator that is neither built in nor
    /// registered in this process.
    #[error("comparator {0:?} is not registered")]
    UnresolvableComparator(String),

    /// A cursor operation required an active position but the cursor was on
    /// a sentinel.
    #[error("cursor is not positioned on an entry")]
    InactiveCursor,

    /// The tree was structurally mutated behind an open cursor, which makes
    /// the cursor's position meaningless. Detected fail-fast via a mutation
    /// stamp.
    #[error("cursor invalidated by tree mutation")]
    InvalidatedCursor,

    /// A durable form could not be encoded or decoded.
    #[error("durable form codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}
