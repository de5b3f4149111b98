//! Types defined in AMQP 1.0 specification Part 3: Messaging

/* --------------------------- 3.4 Delivery State --------------------------- */
mod delivery_state;
pub use delivery_state::*;

/* -------------------------- 3.5 Source and Target ------------------------- */
/// 3.5.3 Source
pub mod source;
pub use source::Source;

/// 3.5.4 Target
pub mod target;
pub use target::Target;

mod terminus;
pub use terminus::{DistributionMode, TerminusDurability, TerminusExpiryPolicy};

mod lifetime_policy;
pub use lifetime_policy::{LifetimePolicy, LIFETIME_POLICY};

/* ---------------------------- Supported outcomes --------------------------- */

/// Symbol advertised in `outcomes` for [`Accepted`]
pub const OUTCOME_ACCEPTED: &str = "amqp:accepted:list";

/// Symbol advertised in `outcomes` for [`Rejected`]
pub const OUTCOME_REJECTED: &str = "amqp:rejected:list";

/// Symbol advertised in `outcomes` for [`Released`]
pub const OUTCOME_RELEASED: &str = "amqp:released:list";

/// Symbol advertised in `outcomes` for [`Modified`]
pub const OUTCOME_MODIFIED: &str = "amqp:modified:list";

/* ------------------------------ Filter types ------------------------------ */

/// Legacy direct exchange binding, string key
pub const APACHE_LEGACY_DIRECT_BINDING: &str = "apache.org:legacy-amqp-direct-binding:string";

/// Legacy topic exchange binding, string pattern
pub const APACHE_LEGACY_TOPIC_BINDING: &str = "apache.org:legacy-amqp-topic-binding:string";

/// Legacy headers exchange binding, map of header matches
pub const APACHE_LEGACY_HEADERS_BINDING: &str = "apache.org:legacy-amqp-headers-binding:map";

/// Filter that excludes messages published on the same connection
pub const APACHE_NO_LOCAL_FILTER: &str = "apache.org:no-local-filter:list";

/// JMS style message selector
pub const APACHE_SELECTOR_FILTER: &str = "apache.org:selector-filter:string";
