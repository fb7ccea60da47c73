pub mod notify;

pub use notify::Notifier;
