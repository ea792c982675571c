//! Service layer: roll resolution, the session roll ledger and markdown
//! rendering.

pub mod markdown;
pub mod roll_ledger;
pub mod roll_resolver;
