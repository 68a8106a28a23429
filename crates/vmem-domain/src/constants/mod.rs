//! Domain constants: pricing tables, media knobs, language names.

pub mod credits;
pub mod lang;
pub mod media;
