pub mod logging;
pub mod session;
pub mod settings;
