//! ChatBud backend: creates Razorpay subscriptions and upgrades users to
//! premium in Firebase when Razorpay reports the subscription live.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod firebase;
pub mod razorpay_client;
pub mod razorpay_handler;
pub mod signature;

pub use config::Config;
pub use dispatch::{DispatchOutcome, UserStore};
pub use razorpay_client::SubscriptionGateway;
pub use razorpay_handler::{app, AppState};
