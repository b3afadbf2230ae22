//! Integrationstests der Client-Engine gegen einen echten Relay-Server
