//! Account locking for strict two-phase locking.
//!
//! Transactions take READ or WRITE locks on accounts and keep them until they
//! commit or abort. Read locks are shared between transactions; a write lock
//! is exclusive. A transaction that is the only holder of a lock may promote
//! it from READ to WRITE in place.

mod mode;
mod resource;
mod table;

pub use mode::LockMode;
pub use resource::{Lock, LockSnapshot};
pub use table::LockTable;
