mod host;

pub use host::story_hostname;
