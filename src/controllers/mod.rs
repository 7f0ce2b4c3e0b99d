pub mod admin_controller;
pub mod assignment_controller;
pub mod bidding_controller;
pub mod driver_controller;
pub mod trigger_controller;
