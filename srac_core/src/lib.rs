pub mod codec;
pub mod container;
pub mod error;
pub mod format;
pub mod stats;
pub mod stripe;

pub use codec::{BlockCodec, DictTrainer};
pub use container::{read_toc, Container};
pub use error::{Error, Result};
pub use format::{Algorithm, CompressionParams, FileHeader, StripeHeader};
pub use stats::Stats;
pub use stripe::StripeCodec;
