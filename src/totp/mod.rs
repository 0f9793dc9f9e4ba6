pub mod engine;

pub use engine::{Enrollment, TotpConfig, TotpEngine, TotpError};
