pub mod builtin;
pub mod detection;
pub mod error;
pub mod ids;
pub mod pattern;
pub mod record;
pub mod registry;
pub mod session;
pub mod theme;
pub mod thresholds;

pub use builtin::*;
pub use detection::*;
pub use error::*;
pub use ids::*;
pub use pattern::*;
pub use record::*;
pub use registry::*;
pub use session::*;
pub use theme::*;
pub use thresholds::*;
