pub mod documentation;
pub mod events;
pub mod health_service;
pub mod ranking_service;
pub mod scoring_service;
pub mod socket_service;
pub mod storage_supervisor;
