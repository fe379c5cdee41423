//! Real-time updates
//!
//! Keeps visit data fresh by binding reloadable components to the topics a
//! server-push transport publishes "new visit" notifications on.

pub mod binder;
pub mod topics;
pub mod transport;

pub use binder::{Reloadable, TopicBinder};
pub use transport::{MemoryHub, MessageHandler, PushTransport, SubscriptionHandle};
