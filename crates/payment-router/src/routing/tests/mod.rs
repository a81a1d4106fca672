mod common;
mod properties;
mod selector;
mod validation;
