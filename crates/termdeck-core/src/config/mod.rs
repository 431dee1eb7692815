mod settings;

pub use settings::{GitSettings, ScannerSettings, SessionSettings, Settings};
