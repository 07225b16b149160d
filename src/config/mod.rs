mod settings;

pub use settings::{expand_tilde, Config, Settings};
