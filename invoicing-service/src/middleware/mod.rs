pub mod account;

pub use account::{AccountId, ACCOUNT_ID_HEADER};
