mod cop;
pub mod helpers;
mod secret;

pub use cop::{Cop, CopConversionError, COP_CURRENCY_CODE};
pub use secret::Secret;
