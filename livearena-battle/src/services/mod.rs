//! External collaborators
//!
//! Each collaborator is an async trait so the engine can run against real
//! platform services or the in-memory implementations used by the binary and
//! tests.

pub mod chat;
pub mod ledger;
pub mod media;
pub mod notify;

pub use chat::{ChatTransport, EventBusChatTransport};
pub use ledger::{CreditReceipt, CreditRequest, InMemoryWalletLedger, WalletLedgerService};
pub use media::{InMemoryMediaCapture, MediaCaptureService, MediaConstraints, MediaStream, ParticipantRole};
pub use notify::{CollectingNotifier, Notification, NotificationKind, NotificationService, TracingNotifier};
