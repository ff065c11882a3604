// Entity Models
// "Identity persists, values change"
//
// - AccountBalance: named holding, identity regenerated each week
// - Period: immutable weekly snapshot appended to history
// - PeriodDraft: the week currently being edited

pub mod account;
pub mod period;

pub use account::{recompute_linked_balances, AccountBalance};
pub use period::{Period, PeriodDraft};
