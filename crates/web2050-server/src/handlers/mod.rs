//! HTTP request handlers.

pub(crate) mod index;
pub(crate) mod pages;
pub(crate) mod reset;
