pub mod visit;

pub use visit::{Visit, VisitsParams};
