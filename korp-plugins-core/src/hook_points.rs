//! Conventional hook point names used by the Korp backend.
//!
//! These are documentation, not a closed set: any string is a valid hook
//! point, and a name nobody registered for simply dispatches to nothing.

/// Entering an endpoint handler: `(args, starttime)`.
pub const ENTER_HANDLER: &str = "enter_handler";
/// Leaving an endpoint handler: `(endtime, elapsed_time)`.
pub const EXIT_HANDLER: &str = "exit_handler";
/// An error in an endpoint handler: `(error, exc_info)`.
pub const ERROR: &str = "error";
/// Chained over the request arguments: `(args)`.
pub const FILTER_ARGS: &str = "filter_args";
/// Chained over the endpoint result: `(result)`.
pub const FILTER_RESULT: &str = "filter_result";
/// Chained over the CQP commands before running them: `(cqp)`.
pub const FILTER_CQP_INPUT: &str = "filter_cqp_input";
/// Chained over the raw CQP output: `(output, cqp)`.
pub const FILTER_CQP_OUTPUT: &str = "filter_cqp_output";
/// Chained over SQL statements: `(sql)`.
pub const FILTER_SQL: &str = "filter_sql";
/// General logging from any plugin: `(levelname, category, item, value)`.
pub const LOG: &str = "log";
