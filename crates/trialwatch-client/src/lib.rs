pub mod browser;
pub mod smtp;
pub mod table;

pub use browser::{RegistryBrowser, RegistryConfig};
pub use smtp::{SmtpConfig, SmtpNotifier};
pub use table::TableParser;
