pub mod conf;
pub mod correlate;
pub mod parser;
pub mod registry;
pub mod runtime;
pub mod session;

pub use correlate::{correlate, CorrelationConfig, Correlator};
pub use registry::{ParserRegistry, Priority};
pub use session::{ParseSession, Timeline};
