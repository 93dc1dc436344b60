pub mod auth;
pub mod catalog;
pub mod config;
pub mod export;
pub mod gateway;
pub mod query;
pub mod search;
pub mod selection;
pub mod suggest;
