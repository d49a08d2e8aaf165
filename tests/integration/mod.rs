//! Integration tests for tree synchronisation

mod cli_contracts;
mod deferred_actions;
mod merge_convergence;
mod scheduler_scenario;
mod sort_order;
mod support;
mod symlink_cycles;
