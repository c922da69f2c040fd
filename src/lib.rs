//! # gql-bridge
//!
//! Observable fetcher bridge between a GraphQL IDE client and a
//! command/push-event backend transport.
//!
//! A GraphQL exploration client expects a "fetcher": one function that
//! executes a query and yields either a one-shot result or a stream it
//! can subscribe to. The backend speaks a different language: an
//! asynchronous command call per query plus a single shared event channel
//! for pushed results. This crate is the adapter between the two: it
//! issues queries, classifies immediate results versus long-lived
//! streams, demultiplexes push events back to the correct in-flight
//! query, fans events out to concurrent observers, and releases backend
//! resources exactly once all observers have detached.
//!
//! ## Architecture
//!
//! ```text
//! GraphQL IDE component
//!     │ fetch / subscribe / unsubscribe
//!     ├── FetcherBridge (bridge/)
//!     │       │
//!     │       ├── ObservableRegistry (domain/)
//!     │       ├── SubscriptionSet fan-out (domain/)
//!     │       │
//!     └────── Transport (transport/) ──► backend process
//!                 ▲
//!                 └── shared push channel, demultiplexed by
//!                     subscription key
//! ```

pub mod bridge;
pub mod config;
pub mod domain;
pub mod error;
pub mod transport;
