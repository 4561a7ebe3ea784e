//! Flipwright Flip
//!
//! The data model shared by every flipwright crate, plus the two pure
//! building blocks of the workflow:
//!
//! - **Pair allocation**: choosing the word pairs a new flip may use, given
//!   the `used` flags reported by the pair source and the pairs already
//!   claimed by locally pending drafts.
//! - **Permutations**: the identity order of a flip's slots, bijection
//!   checks, and the shuffle that never returns the identity.
//!
//! Nothing in this crate performs I/O.

mod allocate;
mod context;
mod error;
mod image;
mod keywords;
mod payload;
mod permutation;

pub use allocate::{Allocation, allocate_pair, available_pairs, next_pair_index};
pub use context::WorkflowContext;
pub use error::{AllocationError, ShuffleError};
pub use image::{ImageBlob, ImageRef};
pub use keywords::{Keywords, PairId, Translation, WordPair, WordRef};
pub use payload::{FlipPayload, FlipSubmission, SigningKey, TxHash};
pub use permutation::{identity_order, is_bijection, shuffle_order, validate_order};
