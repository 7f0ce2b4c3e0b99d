pub mod assignment_repository;
pub mod bid_repository;
pub mod driver_repository;
pub mod health_repository;
pub mod metrics_repository;
pub mod notification_repository;
pub mod route_repository;
pub mod shift_repository;
