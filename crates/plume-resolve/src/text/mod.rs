//! Text folding and resemblance scoring shared by every comparison.
//!
//! Nothing here alters stored or displayed data; the folded forms only drive
//! matching decisions.

pub mod normalize;
pub mod similarity;

pub use normalize::normalize;
pub use similarity::similarity;
