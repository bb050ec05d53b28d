//! Integration tests: staking pipeline, dashboard API and HTTP clients.

mod api_clients;
mod dashboard_flow;
mod mock_chain;
mod staking_flow;
