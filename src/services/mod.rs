//! Cross-view services: notifications, the mutation protocol and the OAuth
//! callback listener.

pub mod callback_listener;
pub mod mutation;
pub mod notifications;

pub use callback_listener::CallbackListener;
pub use mutation::{Action, Reconcile, ViewCache, load_into, mutate_then_reconcile};
pub use notifications::{
    ConsoleNotifier, Notification, NotificationFeed, NotificationLevel, Notifier,
};
