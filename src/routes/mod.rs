pub mod auth;
pub mod automate;
pub mod challenges;
pub mod community;
pub mod contact;
pub mod content;
pub mod diary;
pub mod gamification;
pub mod geo;
pub mod moderation;
