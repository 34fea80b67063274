pub mod canonical;
pub mod matching;
pub mod record;
pub mod verification;

pub use canonical::*;
pub use matching::*;
pub use record::*;
pub use verification::*;
