/// Tools Module
///
/// Each tool module exports a `register` function that adds its `ToolSpec`
/// and handler to the registry during server initialization.

pub mod chat;
pub mod echo;
pub mod read_file;
pub mod think;
