//! MySQL source for binlog-index-sync
//!
//! Two ways of reading a MySQL server:
//! - [`MySQLBinlogSource`] follows the row-based binlog as a replica and
//!   delivers events to an [`EventHandler`]
//! - [`MySQLTableReader`] pages through a table for the initial backfill
//!
//! The server must run with `binlog_format=ROW` and the user needs the
//! `REPLICATION SLAVE` and `REPLICATION CLIENT` privileges.

mod client;
pub mod ddl;
mod handler;
mod position;
mod reader;
mod source;
pub mod value;

pub use client::new_mysql_pool;
pub use handler::EventHandler;
pub use position::ReplicationPosition;
pub use reader::{MySQLTableReader, TablePage, TableReader};
pub use source::{MySQLBinlogSource, StreamSource};
