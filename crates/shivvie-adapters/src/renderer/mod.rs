//! Template renderer adapters.

mod case;
mod handlebars;

pub use self::handlebars::HandlebarsRenderer;
