use mysql_async::{Opts, Pool};

/// Create a MySQL connection pool.
///
/// Connections are opened lazily, so this never fails; a bad host or bad
/// credentials surface on the first query.
pub fn new_mysql_pool(opts: Opts) -> Pool {
    tracing::debug!(
        "Creating MySQL connection pool for {}:{}",
        opts.ip_or_hostname(),
        opts.tcp_port()
    );
    Pool::new(opts)
}
