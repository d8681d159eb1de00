pub(crate) mod health_check_controller;
pub(crate) mod linkedin_verification_controller;
