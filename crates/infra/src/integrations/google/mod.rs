//! Google integrations
//!
//! Calendar and Gmail ride a single Google credential; both clients share
//! one [`oauth::GoogleOAuth`] exchanger, and the session coordinator pushes
//! every refreshed token into both.

pub mod calendar;
pub mod gmail;
pub mod oauth;

pub use calendar::GoogleCalendarClient;
pub use gmail::GmailClient;
pub use oauth::GoogleOAuth;
