//! Data models exchanged with the Buddy backend and persisted locally.

pub mod account;
pub mod auth;
pub mod pet;
pub mod user;

pub use account::{AccountRequest, ConfirmEmailRequest, ResendVerificationRequest};
pub use auth::{AuthRequest, AuthResponse};
pub use pet::{Pet, PetImage, PetPage, PetQuery, ShelterCompact};
pub use user::{Profile, ProfileType, StoredUser};
