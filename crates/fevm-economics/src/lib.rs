//! # FEVM Economics
//!
//! Ledger-native token amounts, 20-byte account addresses and the balance
//! bookkeeping used to escrow and pay out storage bounties.

pub mod balance;
pub mod storage;
pub mod types;

pub use balance::BalanceManager;
pub use storage::{LedgerStorage, MemoryStorage, TransferRecord};
pub use types::{AccountAddress, TokenAmount, ATTO_PER_TOKEN, TOKEN_DECIMALS};
