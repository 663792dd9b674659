pub mod aws;
pub mod item_store;
pub mod object_store;
pub mod observer;
pub mod publisher;
