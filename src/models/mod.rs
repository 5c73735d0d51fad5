//! Domain types shared by services and routes.

pub mod article;
pub mod event;

pub use self::article::*;
pub use self::event::*;
