pub mod agent;
pub mod author;
pub mod distribution;
pub mod execution;
pub mod issue;
pub mod schedule;
pub mod subscriber;
pub mod workflow;

pub use agent::*;
pub use author::*;
pub use distribution::*;
pub use execution::*;
pub use issue::*;
pub use schedule::*;
pub use subscriber::*;
pub use workflow::*;
