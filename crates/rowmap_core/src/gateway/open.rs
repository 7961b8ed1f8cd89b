//! Connection bootstrap for configured SQLite targets.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections wait up to `BUSY_TIMEOUT` on a locked database.

use super::sqlite::DatabaseTarget;
use super::GatewayResult;
use log::{error, info};
use rusqlite::Connection;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens one connection for `target`.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub(super) fn open_target(database: &str, target: &DatabaseTarget) -> GatewayResult<Connection> {
    let started_at = Instant::now();
    let mode = target.mode();
    info!("event=db_open module=gateway status=start database={database} mode={mode}");

    let opened = match target {
        DatabaseTarget::File(path) => Connection::open(path),
        DatabaseTarget::Memory => Connection::open_in_memory(),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=gateway status=error database={database} mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn) {
        Ok(()) => {
            info!(
                "event=db_open module=gateway status=ok database={database} mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=gateway status=error database={database} mode={mode} duration_ms={} error_code=db_configure_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}
