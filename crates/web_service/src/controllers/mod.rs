pub mod generation_controller;
pub mod pricing_controller;
pub mod profile_controller;
pub mod system_controller;
pub mod trip_controller;
