//! Domain logic for herald.
//!
//! Everything the job handlers need that is not tied to the queue substrate:
//!
//! - **Records**: on-chain items and notification content ([`events`])
//! - **Cursors**: totally ordered polling positions ([`Cursor`])
//! - **Filters**: per-destination message class predicates ([`filter`])
//! - **Destinations**: the immutable channel registry ([`DestinationRegistry`])
//! - **Rendering**: per-platform message templates ([`render`])
//! - **Chunking**: line-respecting message splitting ([`chunk`])
//! - **Data source**: indexer queries ([`ChainDataSource`], [`IndexerClient`])
//! - **Platforms**: Discord, Telegram and Twitter delivery clients ([`platforms`])

pub mod chunk;
pub mod cursor;
pub mod destinations;
pub mod events;
pub mod filter;
pub mod indexer;
pub mod platforms;
pub mod render;
pub mod source;

pub use cursor::Cursor;
pub use destinations::{Credentials, Destination, DestinationRegistry, Platform};
pub use events::{
    Burn, Delegation, DelegationKind, DelegationStatus, LiquidityDeposit, NotificationContent,
    Swap, VolumeSummary,
};
pub use filter::{FilterRule, MessageClass, NotificationEvent, can_send};
pub use indexer::IndexerClient;
pub use platforms::{DeliveryError, PlatformClient, PlatformClients, SentMessage};
pub use source::{ChainDataSource, SourceError};
