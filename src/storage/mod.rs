mod credentials;

pub use credentials::{CredentialStore, StoreError, StoredCredential};
