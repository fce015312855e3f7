mod client;
mod types;

pub use client::{ApiClient, ApiError, NewStory, DEFAULT_BASE_URL, PAGE_SIZE};
pub use types::{StoryPayload, UserPayload};
