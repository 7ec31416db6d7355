//! Output emitters. Writers only read the report; nothing here feeds back
//! into rendering.
pub mod json;
pub mod text;
