//! Domain layer: observable identity, observer shapes, subscription
//! fan-out, and the live query registry.
//!
//! This module contains the bridge-side model of an in-flight query: the
//! observable state machine's data, the subscription table delivering
//! fan-out, and the registry that demultiplexes push events by backend
//! subscription key.

pub mod observable;
pub mod observable_id;
pub mod observer;
pub mod registry;
pub mod subscription_key;
pub mod subscriptions;

pub use observable::Observable;
pub use observable_id::ObservableId;
pub use observer::{ExecutionResult, Observer, SingleShotFn, StreamingObserver};
pub use registry::{ObservableRef, ObservableRegistry};
pub use subscription_key::SubscriptionKey;
pub use subscriptions::{SubscriptionHandle, SubscriptionSet};
