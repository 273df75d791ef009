pub mod auth;
pub mod context;
pub mod errors;
pub mod history;
pub mod logging;
pub mod mingle_config;
pub mod project;
pub mod tabs;
pub mod view;
