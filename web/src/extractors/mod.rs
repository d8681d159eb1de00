pub(crate) mod agent_credential;
