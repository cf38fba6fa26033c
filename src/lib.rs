//! Language-filtered, class-balanced dataset preparation for toxic-comment
//! classifiers.
//!
//! ```no_run
//! use comment_prep::{DatasetPreparer, PrepareConfig};
//!
//! # fn main() -> comment_prep::Result<()> {
//! let config = PrepareConfig { seed: Some(42), ..Default::default() };
//! let preparer = DatasetPreparer::new(config)?;
//! let mut rng = preparer.config().rng();
//! let (x_train, x_val, y_train, y_val) = preparer.load_train_validation(&mut rng)?;
//! # let _ = (x_train, x_val, y_train, y_val);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod output;
pub mod prepare;

pub use config::PrepareConfig;
pub use data::model::{Label, LabeledExample, Split};
pub use error::{PrepError, Result};
pub use prepare::{DatasetPreparer, PrepReport};
