pub mod app;
pub mod commands;
pub mod config;
pub mod date;
pub mod effects;
pub mod games;
pub mod history;
pub mod konami;
pub mod logger;
pub mod net;
pub mod output;
pub mod parser;
pub mod prefs;
pub mod profile;
pub mod scheduler;
pub mod sessions;
pub mod state;
pub mod terminal;
pub mod vfs;
pub mod widgets;
