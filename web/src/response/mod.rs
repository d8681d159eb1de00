pub(crate) mod linkedin_verification;
