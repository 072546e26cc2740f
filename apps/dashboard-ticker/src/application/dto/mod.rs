//! Data Transfer Objects (DTOs)
//!
//! Inputs for the management operations. They deserialize directly from
//! the JSON request bodies of the HTTP layer.

mod dashboard_dto;

pub use dashboard_dto::{
    ContentUpdate, DashboardUpdate, FeedUpdate, InvalidInput, NewContent, NewDashboard, NewFeed,
};
